//! Analysis request types
//!
//! A request is created at enqueue time, consumed exactly once by the
//! scheduler and discarded after producing an outcome. The queue is not
//! persisted across process restarts.

use crate::agent::AgentProfile;
use crate::session::SessionMode;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Variant-specific payload of an analysis request
#[derive(Debug, Clone)]
pub enum AnalysisPayload {
    /// Single captured frame, as encoded image bytes
    Frame {
        image: Bytes,
        width: u32,
        height: u32,
    },
    /// Local video clip, sampled at `fps` over an optional time range
    Clip {
        path: PathBuf,
        fps: f32,
        start_sec: Option<f32>,
        end_sec: Option<f32>,
    },
    /// Video hosted elsewhere, analyzed around an optional timestamp
    RemoteVideo {
        url: String,
        timestamp_sec: Option<f32>,
    },
}

/// One unit of work for the remote analysis collaborator
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Fully rendered prompt (persona + mode + optional user note)
    pub prompt: String,
    pub agent: AgentProfile,
    pub mode: SessionMode,
    pub enqueued_at: DateTime<Utc>,
    pub payload: AnalysisPayload,
}

impl AnalysisRequest {
    pub fn frame(
        prompt: String,
        agent: AgentProfile,
        mode: SessionMode,
        image: Bytes,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            prompt,
            agent,
            mode,
            enqueued_at: Utc::now(),
            payload: AnalysisPayload::Frame {
                image,
                width,
                height,
            },
        }
    }

    pub fn clip(
        prompt: String,
        agent: AgentProfile,
        mode: SessionMode,
        path: PathBuf,
        fps: f32,
        start_sec: Option<f32>,
        end_sec: Option<f32>,
    ) -> Self {
        Self {
            prompt,
            agent,
            mode,
            enqueued_at: Utc::now(),
            payload: AnalysisPayload::Clip {
                path,
                fps,
                start_sec,
                end_sec,
            },
        }
    }

    pub fn remote_video(
        prompt: String,
        agent: AgentProfile,
        mode: SessionMode,
        url: String,
        timestamp_sec: Option<f32>,
    ) -> Self {
        Self {
            prompt,
            agent,
            mode,
            enqueued_at: Utc::now(),
            payload: AnalysisPayload::RemoteVideo { url, timestamp_sec },
        }
    }

    /// Stable label for the payload variant, used in history entries
    pub fn kind(&self) -> &'static str {
        match self.payload {
            AnalysisPayload::Frame { .. } => "frame",
            AnalysisPayload::Clip { .. } => "clip",
            AnalysisPayload::RemoteVideo { .. } => "remote-video",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentProfile;

    fn agent() -> AgentProfile {
        AgentProfile::new("chef", "Chef", "persona")
    }

    #[test]
    fn test_frame_request_kind() {
        let req = AnalysisRequest::frame(
            "p".to_string(),
            agent(),
            SessionMode::RealTime,
            Bytes::from_static(&[0u8; 16]),
            4,
            4,
        );
        assert_eq!(req.kind(), "frame");
    }

    #[test]
    fn test_clip_request_fields() {
        let req = AnalysisRequest::clip(
            "p".to_string(),
            agent(),
            SessionMode::StepByStep,
            PathBuf::from("/tmp/clip.mp4"),
            1.0,
            Some(2.0),
            None,
        );
        assert_eq!(req.kind(), "clip");
        match req.payload {
            AnalysisPayload::Clip { fps, start_sec, end_sec, .. } => {
                assert_eq!(fps, 1.0);
                assert_eq!(start_sec, Some(2.0));
                assert_eq!(end_sec, None);
            }
            _ => panic!("Expected clip payload"),
        }
    }

    #[test]
    fn test_remote_video_kind() {
        let req = AnalysisRequest::remote_video(
            "p".to_string(),
            agent(),
            SessionMode::OnDemand,
            "https://example.com/v.mp4".to_string(),
            Some(12.5),
        );
        assert_eq!(req.kind(), "remote-video");
    }
}
