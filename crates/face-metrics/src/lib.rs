//! Geometric Feature Extraction
//!
//! Maps facial landmark points and region boxes to the scalar ratios the
//! decision engine consumes:
//! - EAR (eye aspect ratio): low values indicate closed eyes
//! - MAR (mouth aspect ratio): high values indicate an open mouth
//! - area-ratio fallback when only bounding boxes are available
//! - contour-based yawn heuristic for the no-landmark path
//!
//! Every function here is pure and deterministic. Landmark noise is expected,
//! so degenerate geometry yields safe defaults instead of errors.

mod geometry;
mod ratios;
mod sample;
mod yawn;

pub use geometry::{Point2, Rect};
pub use ratios::{eye_area_ratio, eye_aspect_ratio, mouth_aspect_ratio, DEGENERATE_RATIO};
pub use sample::FeatureSample;
pub use yawn::yawn_heuristic;
