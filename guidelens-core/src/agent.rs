//! Agent personas and the built-in registry

use crate::error::Error;
use crate::session::SessionMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An assistance persona the user can run a session with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Stable identifier ("chef", "crafter", ...)
    pub id: String,
    /// Human-readable name shown in the UI
    pub display_name: String,
    /// Persona preamble prepended to every analysis prompt
    pub prompt_persona: String,
}

impl AgentProfile {
    pub fn new(id: &str, display_name: &str, prompt_persona: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            prompt_persona: prompt_persona.to_string(),
        }
    }

    /// Render the full analysis prompt for this persona in the given mode.
    ///
    /// The optional user note is appended verbatim so explicit questions
    /// ("is the dough ready?") reach the analysis collaborator unchanged.
    pub fn render_prompt(&self, mode: SessionMode, user_note: Option<&str>) -> String {
        let mut prompt = format!(
            "{}\nYou are assisting in a {} guidance session. \
             Look at what the user is doing and give one concrete, actionable next step.",
            self.prompt_persona,
            mode.label()
        );
        if let Some(note) = user_note {
            let note = note.trim();
            if !note.is_empty() {
                prompt.push_str("\nUser question: ");
                prompt.push_str(note);
            }
        }
        prompt
    }
}

/// Read-only lookup of the available personas.
///
/// The registry is seeded with the built-in GuideLens personas; callers may
/// register additional ones at construction time but the session core only
/// ever reads from it.
pub struct AgentRegistry {
    agents: HashMap<String, AgentProfile>,
}

impl AgentRegistry {
    /// Registry with the four built-in GuideLens personas
    pub fn builtin() -> Self {
        let mut registry = Self {
            agents: HashMap::new(),
        };
        registry.register(AgentProfile::new(
            "chef",
            "Chef",
            "You are an experienced, encouraging cooking instructor.",
        ));
        registry.register(AgentProfile::new(
            "crafter",
            "Crafter",
            "You are a patient crafting mentor with an eye for detail.",
        ));
        registry.register(AgentProfile::new(
            "diy",
            "DIY Helper",
            "You are a practical home-improvement expert who puts safety first.",
        ));
        registry.register(AgentProfile::new(
            "buddy",
            "Buddy",
            "You are a warm, attentive companion.",
        ));
        registry
    }

    /// Empty registry for callers that provide their own personas
    pub fn empty() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    pub fn register(&mut self, agent: AgentProfile) {
        self.agents.insert(agent.id.clone(), agent);
    }

    pub fn get(&self, id: &str) -> Result<&AgentProfile, Error> {
        self.agents
            .get(id)
            .ok_or_else(|| Error::AgentNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// All registered profiles, in unspecified order
    pub fn all(&self) -> Vec<&AgentProfile> {
        self.agents.values().collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
