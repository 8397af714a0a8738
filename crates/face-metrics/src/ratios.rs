//! Aspect-ratio computations over eye and mouth landmarks

use crate::geometry::{Point2, Rect};

/// Safe ratio returned for degenerate or incomplete geometry
///
/// 0.3 sits comfortably above the usual closed-eye EAR band and below the
/// usual yawn MAR band, so a noisy frame biases toward "nothing detected"
/// on both channels instead of raising an error.
pub const DEGENERATE_RATIO: f32 = 0.3;

/// Eye aspect ratio over 6 ordered contour points
///
/// Point layout follows the 68-landmark convention: p0/p3 are the horizontal
/// eye corners, p1/p5 and p2/p4 the upper/lower lid pairs.
///
/// EAR = (|p1-p5| + |p2-p4|) / (2 * |p0-p3|)
///
/// Fewer than 6 points or a zero-width eye returns `DEGENERATE_RATIO`.
pub fn eye_aspect_ratio(points: &[Point2]) -> f32 {
    if points.len() < 6 {
        return DEGENERATE_RATIO;
    }

    let horizontal = points[0].distance(&points[3]);
    if horizontal <= f32::EPSILON {
        return DEGENERATE_RATIO;
    }

    let v1 = points[1].distance(&points[5]);
    let v2 = points[2].distance(&points[4]);

    (v1 + v2) / (2.0 * horizontal)
}

/// Mouth aspect ratio over 8 ordered mouth points
///
/// p0/p4 are the mouth corners; p2/p6 and p3/p7 are the vertical lip pairs.
///
/// MAR = (|p2-p6| + |p3-p7|) / (2 * |p0-p4|)
///
/// Same degenerate-input policy as `eye_aspect_ratio`.
pub fn mouth_aspect_ratio(points: &[Point2]) -> f32 {
    if points.len() < 8 {
        return DEGENERATE_RATIO;
    }

    let horizontal = points[0].distance(&points[4]);
    if horizontal <= f32::EPSILON {
        return DEGENERATE_RATIO;
    }

    let v1 = points[2].distance(&points[6]);
    let v2 = points[3].distance(&points[7]);

    (v1 + v2) / (2.0 * horizontal)
}

/// Summed eye-box area over face-box area, for the region-only fallback tier
///
/// Returns 0.0 when the face box is degenerate or fewer than two eye boxes
/// were detected; the coarse tier treats a missing second eye as closed.
pub fn eye_area_ratio(eyes: &[Rect], face: &Rect) -> f32 {
    let face_area = face.area();
    if face_area == 0 || eyes.len() < 2 {
        return 0.0;
    }

    let eye_area: u64 = eyes.iter().map(Rect::area).sum();
    eye_area as f32 / face_area as f32
}
