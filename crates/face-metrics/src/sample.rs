//! Per-frame feature record

use std::time::Instant;

/// Scalar geometric features computed for one frame
///
/// `ear` holds the averaged eye aspect ratio on the landmark path, or the
/// eye-box area ratio on the region fallback path. `mar` is absent whenever
/// the active backend produced no mouth landmarks.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSample {
    /// Eye openness measure (EAR or area ratio, backend dependent)
    pub ear: f32,
    /// Mouth aspect ratio, if mouth landmarks were available
    pub mar: Option<f32>,
    /// Monotonic timestamp taken when the features were computed
    pub captured_at: Instant,
}

impl FeatureSample {
    pub fn new(ear: f32, mar: Option<f32>) -> Self {
        Self {
            ear,
            mar,
            captured_at: Instant::now(),
        }
    }
}
