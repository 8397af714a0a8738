//! Monitoring Session Orchestration
//!
//! Drives the per-frame cycle (provider -> feature extraction -> decision
//! engine) inside a cancellable sequential loop. One session owns one camera
//! claim, one provider, and one decision engine; sessions share nothing.

pub mod pipeline;
pub mod session;
pub mod settings;

pub use pipeline::{FrameAnalysis, FramePipeline};
pub use session::{MonitorSession, SessionHandle, SessionStats};
pub use settings::{CameraSettings, MonitorSettings};

use camera_capture::CameraError;
use drowsiness::DetectionError;
use thiserror::Error;

/// Session startup errors
///
/// Only startup conditions surface here; once the loop is running, frame
/// failures are absorbed and the loop continues.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error("Settings error: {0}")]
    Settings(String),
}
