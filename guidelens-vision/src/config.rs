//! Configuration for the camera capture pipeline

use serde::{Deserialize, Serialize};

/// Which physical camera feeds the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraFacing {
    Back,
    Front,
}

impl CameraFacing {
    pub fn toggled(self) -> Self {
        match self {
            CameraFacing::Back => CameraFacing::Front,
            CameraFacing::Front => CameraFacing::Back,
        }
    }
}

/// Resolution and frame rate requested when binding the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureTarget {
    pub resolution: (u32, u32),
    pub fps: u32,
}

impl Default for CaptureTarget {
    fn default() -> Self {
        Self {
            resolution: (640, 480),
            fps: 15,
        }
    }
}

/// Camera capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Active camera
    pub facing: CameraFacing,

    /// Device index of the rear camera
    pub back_camera_id: u32,

    /// Device index of the front camera
    pub front_camera_id: u32,

    /// Capture resolution (width, height)
    pub resolution: (u32, u32),

    /// Accepted frame rate. Frames arriving faster are dropped, bounding
    /// the production rate regardless of the driver's cadence.
    pub target_fps: u32,

    /// Broadcast capacity for frame/metric subscribers
    pub broadcast_capacity: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            facing: CameraFacing::Back,
            back_camera_id: 0,
            front_camera_id: 1,
            resolution: (640, 480),
            target_fps: 15,
            broadcast_capacity: 16,
        }
    }
}

impl VisionConfig {
    /// Device index for the active facing
    pub fn device_id(&self) -> u32 {
        match self.facing {
            CameraFacing::Back => self.back_camera_id,
            CameraFacing::Front => self.front_camera_id,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.target_fps == 0 || self.target_fps > 120 {
            return Err("Target fps must be between 1 and 120".to_string());
        }
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err("Resolution must be non-zero".to_string());
        }
        let total_pixels = self
            .resolution
            .0
            .checked_mul(self.resolution.1)
            .ok_or_else(|| "Resolution would cause integer overflow".to_string())?;
        if total_pixels > 100_000_000 {
            return Err("Resolution too large (max 100M pixels)".to_string());
        }
        if self.back_camera_id > 100 || self.front_camera_id > 100 {
            return Err("Camera ID too large (max 100)".to_string());
        }
        if self.broadcast_capacity == 0 {
            return Err("Broadcast capacity must be non-zero".to_string());
        }
        Ok(())
    }
}
