//! Drowsiness Detection Core
//!
//! Frame-by-frame driver state analysis:
//! - Landmark providers in three fidelity tiers with startup fallback
//! - Debounced hysteresis decision engine for eye closure and yawning
//! - Per-frame detection events handed to the alerting collaborator

pub mod backends;
pub mod config;
pub mod engine;
pub mod event;
pub mod landmarks;
pub mod provider;

pub use config::{DetectionConfig, DetectorPreference};
pub use engine::{DebounceChannel, DecisionEngine, FrameSignal, ResetPolicy, SignalSource};
pub use event::{DetectionEvent, EventKind};
pub use landmarks::{FaceLandmarks, LandmarkSet, RegionSet};
pub use provider::{default_chain, select_provider, LandmarkProvider, ProviderFactory, ProviderTier};

use thiserror::Error;

/// Detection error types
///
/// Only `NoProviderAvailable` is initialization-fatal; everything else is
/// absorbed per frame by the pipeline and logged as a recoverable failure.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("No detection backend available")]
    NoProviderAvailable,

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
