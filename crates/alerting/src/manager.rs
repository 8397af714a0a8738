//! Alert deduplication and throttling

use chrono::{DateTime, Utc};
use drowsiness::{DetectionEvent, EventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Alert severity derived from detection confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Minimum detection confidence before an alert is considered
    pub confidence_threshold: f32,
    /// Confidence at or above which an alert is critical
    pub critical_threshold: f32,
    /// Cooldown between alerts of the same kind (seconds)
    pub cooldown_seconds: u64,
    /// Maximum alerts per hour before throttling
    pub max_alerts_per_hour: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            critical_threshold: 0.90,
            cooldown_seconds: 5,
            max_alerts_per_hour: 120,
        }
    }
}

/// A surfaced alert, ready for storage or delivery
#[derive(Debug, Clone, Serialize)]
pub struct AlertRecord {
    pub id: uuid::Uuid,
    pub kind: EventKind,
    pub description: String,
    pub severity: Severity,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct KindState {
    last_fired: Instant,
    fire_count: usize,
}

/// Filters the per-frame event stream down to actionable alerts
///
/// Per-kind cooldown absorbs the frame-rate repetition of a single sustained
/// episode; the hourly cap bounds total alert volume regardless of kind.
pub struct AlertManager {
    config: AlertConfig,
    states: HashMap<EventKind, KindState>,
    hourly_count: usize,
    hour_start: Instant,
}

impl AlertManager {
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            states: HashMap::new(),
            hourly_count: 0,
            hour_start: Instant::now(),
        }
    }

    /// Consume one detection event, producing an alert record when it passes
    /// confidence, cooldown, and throttle checks
    pub fn ingest(&mut self, event: &DetectionEvent) -> Option<AlertRecord> {
        if !event.is_alert() {
            return None;
        }
        if !self.should_fire(event.kind, event.confidence) {
            return None;
        }
        self.record_fire(event.kind);

        Some(AlertRecord {
            id: uuid::Uuid::new_v4(),
            kind: event.kind,
            description: describe(event),
            severity: self.severity(event.confidence),
            confidence: event.confidence,
            timestamp: Utc::now(),
        })
    }

    fn should_fire(&mut self, kind: EventKind, confidence: f32) -> bool {
        if confidence < self.config.confidence_threshold {
            debug!(
                "Alert suppressed: confidence {} < threshold {}",
                confidence, self.config.confidence_threshold
            );
            return false;
        }

        if self.hour_start.elapsed() > Duration::from_secs(3600) {
            self.hourly_count = 0;
            self.hour_start = Instant::now();
        }

        if self.hourly_count >= self.config.max_alerts_per_hour {
            warn!("Alert throttled: max alerts per hour reached");
            return false;
        }

        if let Some(state) = self.states.get(&kind) {
            let cooldown = Duration::from_secs(self.config.cooldown_seconds);
            if state.last_fired.elapsed() < cooldown {
                debug!("Alert suppressed: in cooldown period");
                return false;
            }
        }

        true
    }

    fn record_fire(&mut self, kind: EventKind) {
        self.hourly_count += 1;

        let state = self.states.entry(kind).or_insert(KindState {
            last_fired: Instant::now(),
            fire_count: 0,
        });
        state.last_fired = Instant::now();
        state.fire_count += 1;

        info!("Alert recorded: {:?} (count: {})", kind, state.fire_count);
    }

    /// Severity level for a given detection confidence
    pub fn severity(&self, confidence: f32) -> Severity {
        if confidence >= self.config.critical_threshold {
            Severity::Critical
        } else if confidence >= 0.7 {
            Severity::High
        } else if confidence >= self.config.confidence_threshold {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Alerts fired in the current hour window
    pub fn hourly_count(&self) -> usize {
        self.hourly_count
    }

    /// Clear all cooldown state and counters
    pub fn clear(&mut self) {
        self.states.clear();
        self.hourly_count = 0;
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

fn describe(event: &DetectionEvent) -> String {
    match event.kind {
        EventKind::Drowsy => match event.sample {
            Some(sample) => format!("Sustained eye closure (eye ratio {:.3})", sample.ear),
            None => "Sustained eye closure".to_string(),
        },
        EventKind::Yawning => match event.sample.and_then(|s| s.mar) {
            Some(mar) => format!("Yawning (mouth ratio {:.3})", mar),
            None => "Yawning".to_string(),
        },
        EventKind::None => String::new(),
    }
}
