//! Landmark and region data produced by the detection backends

use face_metrics::{Point2, Rect};
use serde::{Deserialize, Serialize};

/// Named facial landmark points from a landmark-capable backend
///
/// Eye contours are ordered corner, upper pair, corner, lower pair (the
/// 6-point EAR convention); mouth points are ordered corner, upper lip,
/// corner, lower lip (the 8-point MAR convention).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub left_eye: [Point2; 6],
    pub right_eye: [Point2; 6],
    /// Absent when the backend could not resolve the mouth region
    pub mouth: Option<[Point2; 8]>,
}

/// Bounding boxes from the region-only fallback backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSet {
    pub face: Rect,
    /// Detected eye boxes; fewer than two means an eye was not found
    pub eyes: Vec<Rect>,
    /// Lower-face mouth region, when the face box allows one
    pub mouth: Option<Rect>,
}

/// Per-frame output of a landmark provider
///
/// Exactly one variant is produced per frame with a visible face; the
/// provider returns `None` instead when no face is detected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LandmarkSet {
    /// Ordered landmark points (high-fidelity and mesh tiers)
    Landmarks(FaceLandmarks),
    /// Axis-aligned boxes only (cascade tier)
    Regions(RegionSet),
}
