//! Per-frame detection events

use face_metrics::FeatureSample;
use serde::{Deserialize, Serialize};

/// Dominant event classification for one frame
///
/// Both channels can trigger in the same frame; `Drowsy` takes precedence in
/// `kind` and the per-channel booleans on `DetectionEvent` carry the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    #[default]
    None,
    Drowsy,
    Yawning,
}

/// Decision engine output for one frame
///
/// Never persisted by the core; handed to the alerting collaborator which
/// owns storage and delivery.
#[derive(Debug, Clone, Copy)]
pub struct DetectionEvent {
    pub kind: EventKind,
    /// Drowsiness channel is in Triggered state
    pub is_drowsy: bool,
    /// Yawn channel is in Triggered state
    pub is_yawning: bool,
    /// Features computed this frame, absent when no face was detected
    pub sample: Option<FeatureSample>,
    /// How far the triggering feature sits past its threshold, in [0, 1]
    pub confidence: f32,
}

impl DetectionEvent {
    /// Quiet event for frames without a face or with absorbed failures
    pub fn none() -> Self {
        Self {
            kind: EventKind::None,
            is_drowsy: false,
            is_yawning: false,
            sample: None,
            confidence: 0.0,
        }
    }

    /// Whether either channel is triggered
    pub fn is_alert(&self) -> bool {
        self.kind != EventKind::None
    }
}
