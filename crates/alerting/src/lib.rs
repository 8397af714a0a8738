//! Alerting
//!
//! Turns the raw per-frame event stream into deduplicated, throttled alert
//! records. Detection emits an event every frame while a condition holds;
//! this crate decides which of those are worth surfacing.

pub mod manager;

pub use manager::{AlertConfig, AlertManager, AlertRecord, Severity};
