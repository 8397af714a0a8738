//! Detection configuration

use crate::engine::ResetPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which backend tier the fallback chain may select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorPreference {
    /// Probe all tiers in priority order
    #[default]
    Auto,
    /// Pin to the 68-landmark regressor
    HighFidelity,
    /// Pin to the face-mesh model
    Light,
    /// Pin to the cascade-based region detector
    Fallback,
}

/// Detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// EAR below this counts as a closed-eye frame (landmark tiers)
    pub ear_threshold: f32,

    /// Eye-box area ratio below this counts as a closed-eye frame
    /// (region fallback tier)
    pub area_ratio_threshold: f32,

    /// MAR above this counts as a yawn frame
    pub mouth_threshold: f32,

    /// Consecutive condition frames required before a channel triggers
    pub consecutive_frames: u32,

    /// Counter behavior when a condition clears
    pub reset_policy: ResetPolicy,

    /// Backend tier restriction
    pub detector_preference: DetectorPreference,

    /// Model paths; a missing path makes the tier unavailable
    pub landmark_model_path: Option<PathBuf>,
    pub mesh_model_path: Option<PathBuf>,
    pub cascade_model_path: Option<PathBuf>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            area_ratio_threshold: 0.10,
            mouth_threshold: 0.7,
            consecutive_frames: 30,
            reset_policy: ResetPolicy::Hard,
            detector_preference: DetectorPreference::Auto,
            landmark_model_path: None,
            mesh_model_path: None,
            cascade_model_path: None,
        }
    }
}

impl DetectionConfig {
    /// Preset tuned for the coarse cascade tier
    ///
    /// The region signal is noisier but each decision is cheaper, so the
    /// debounce window is much shorter.
    pub fn cascade() -> Self {
        Self {
            consecutive_frames: 3,
            detector_preference: DetectorPreference::Fallback,
            ..Default::default()
        }
    }

    /// Preset trading detection latency for fewer false positives
    pub fn lenient() -> Self {
        Self {
            ear_threshold: 0.21,
            consecutive_frames: 48,
            ..Default::default()
        }
    }
}
