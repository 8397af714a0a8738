//! Temporal decision engine
//!
//! Converts the noisy per-frame feature stream into debounced events. Two
//! independent channels (eye closure, yawning) run the same state machine:
//! a channel is Quiescent at streak 0, Accumulating below the threshold, and
//! Triggered once the condition has held for `consecutive_frames` in a row.
//!
//! Counter behavior on condition clearing is a deliberate deployment choice:
//! hard reset keeps brief recoveries from masking genuinely intermittent
//! blinking; decay tolerates single dropped frames in an otherwise sustained
//! episode. Both policies exist in the field, so both are supported and one
//! must be picked explicitly per deployment.

use crate::config::DetectionConfig;
use crate::event::{DetectionEvent, EventKind};
use face_metrics::FeatureSample;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Counter behavior when a channel's condition stops holding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetPolicy {
    /// Zero the streak immediately
    #[default]
    Hard,
    /// Decrement the streak by one
    Decay,
}

/// Single-signal debounce state machine
///
/// The streak is monotonically non-decreasing while the condition holds and
/// never goes below zero. The triggered flag is always derived as
/// `streak >= threshold` after the update.
#[derive(Debug, Clone)]
pub struct DebounceChannel {
    threshold: u32,
    policy: ResetPolicy,
    streak: u32,
    triggered: bool,
}

impl DebounceChannel {
    pub fn new(threshold: u32, policy: ResetPolicy) -> Self {
        Self {
            // A zero threshold would trigger on silence
            threshold: threshold.max(1),
            policy,
            streak: 0,
            triggered: false,
        }
    }

    /// Advance one frame; returns whether the channel is now Triggered
    pub fn update(&mut self, condition_met: bool) -> bool {
        if condition_met {
            self.streak = self.streak.saturating_add(1);
        } else {
            match self.policy {
                ResetPolicy::Hard => self.streak = 0,
                ResetPolicy::Decay => self.streak = self.streak.saturating_sub(1),
            }
        }
        self.triggered = self.streak >= self.threshold;
        self.triggered
    }

    /// Return the channel to Quiescent
    pub fn reset(&mut self) {
        self.streak = 0;
        self.triggered = false;
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }
}

/// Where the frame's features came from, which decides the eye threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// Landmark tiers: `ear` is a true eye aspect ratio
    Landmarks,
    /// Cascade tier: `ear` is the eye-box area ratio
    Regions,
}

/// Per-frame input to the engine
#[derive(Debug, Clone, Copy)]
pub struct FrameSignal {
    pub sample: FeatureSample,
    pub source: SignalSource,
    /// Heuristic yawn verdict, used only when `sample.mar` is absent
    pub yawn_hint: Option<bool>,
}

/// Debounced two-channel decision engine
///
/// Owns the only mutable detection state in a session. Counters depend on
/// strict sequential frame order, so an engine must never be shared across
/// concurrently processed frames.
pub struct DecisionEngine {
    ear_threshold: f32,
    area_ratio_threshold: f32,
    mouth_threshold: f32,
    eye: DebounceChannel,
    yawn: DebounceChannel,
}

impl DecisionEngine {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            ear_threshold: config.ear_threshold,
            area_ratio_threshold: config.area_ratio_threshold,
            mouth_threshold: config.mouth_threshold,
            eye: DebounceChannel::new(config.consecutive_frames, config.reset_policy),
            yawn: DebounceChannel::new(config.consecutive_frames, config.reset_policy),
        }
    }

    /// Advance both channels by one frame
    ///
    /// `None` means no face was detected: both conditions are treated as
    /// false, since absent landmarks must not be conflated with closed eyes.
    pub fn advance(&mut self, signal: Option<&FrameSignal>) -> DetectionEvent {
        let (eye_condition, yawn_condition, sample) = match signal {
            None => (false, false, None),
            Some(signal) => {
                let eye_threshold = match signal.source {
                    SignalSource::Landmarks => self.ear_threshold,
                    SignalSource::Regions => self.area_ratio_threshold,
                };
                let eye_condition = signal.sample.ear < eye_threshold;
                // Missing mouth data only silences the yawn channel for
                // this frame; the eye channel is unaffected.
                let yawn_condition = match signal.sample.mar {
                    Some(mar) => mar > self.mouth_threshold,
                    None => signal.yawn_hint.unwrap_or(false),
                };
                (eye_condition, yawn_condition, Some(signal.sample))
            }
        };

        let is_drowsy = self.eye.update(eye_condition);
        let is_yawning = self.yawn.update(yawn_condition);

        let kind = if is_drowsy {
            EventKind::Drowsy
        } else if is_yawning {
            EventKind::Yawning
        } else {
            EventKind::None
        };

        if kind != EventKind::None {
            debug!(
                ?kind,
                eye_streak = self.eye.streak(),
                yawn_streak = self.yawn.streak(),
                "channel triggered"
            );
        }

        DetectionEvent {
            kind,
            is_drowsy,
            is_yawning,
            sample,
            confidence: self.confidence(kind, signal),
        }
    }

    /// Threshold margin of the feature behind the emitted kind, in [0, 1]
    fn confidence(&self, kind: EventKind, signal: Option<&FrameSignal>) -> f32 {
        let Some(signal) = signal else { return 0.0 };
        match kind {
            EventKind::None => 0.0,
            EventKind::Drowsy => {
                let threshold = match signal.source {
                    SignalSource::Landmarks => self.ear_threshold,
                    SignalSource::Regions => self.area_ratio_threshold,
                };
                if threshold <= f32::EPSILON {
                    return 1.0;
                }
                ((threshold - signal.sample.ear) / threshold).clamp(0.0, 1.0)
            }
            EventKind::Yawning => match signal.sample.mar {
                Some(mar) => ((mar - self.mouth_threshold) / self.mouth_threshold).clamp(0.0, 1.0),
                // Heuristic-only verdict carries no margin information
                None => 0.5,
            },
        }
    }

    /// Hard-reset both channels (explicit caller action, e.g. driver change)
    pub fn reset(&mut self) {
        self.eye.reset();
        self.yawn.reset();
    }

    pub fn eye_streak(&self) -> u32 {
        self.eye.streak()
    }

    pub fn yawn_streak(&self) -> u32 {
        self.yawn.streak()
    }
}
