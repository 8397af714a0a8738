//! Camera Capture Abstraction for Drowsiness Monitoring
//!
//! The monitoring core never talks to camera hardware directly. This crate
//! provides:
//! - `VideoFrame`: decoded RGB frames handed to the pipeline one at a time
//! - `FrameSource`: the boundary trait for whatever produces frames
//!   (V4L2 device, video file, synthetic test sequence)
//! - `DeviceRegistry`: exclusive per-index camera claims, so two sessions
//!   cannot silently share one physical device

pub mod frame;
pub mod registry;
pub mod source;

pub use frame::VideoFrame;
pub use registry::{CameraClaim, DeviceRegistry};
pub use source::{FrameSequence, FrameSource};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },

    #[error("Camera {0} is already claimed by another session")]
    Busy(u32),

    #[error("Capture timeout")]
    Timeout,

    #[error("Frame read failed: {0}")]
    Read(String),
}

/// Camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Device index (e.g. 0 for the default webcam)
    pub index: u32,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}
