//! Contour-based yawn heuristic for the no-landmark path
//!
//! When only region boxes are available there is no MAR to threshold, so the
//! mouth crop is binarized and the largest dark blob is measured instead. An
//! open mouth shows up as a large, tall cavity. This is a best-effort signal
//! only; the landmark MAR path is strictly more reliable.

use camera_capture::VideoFrame;
use image::Luma;
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::region_labelling::{connected_components, Connectivity};

/// Pixels darker than this count as mouth cavity
const CAVITY_THRESHOLD: u8 = 60;

/// Minimum blob area as a fraction of face area
const MIN_AREA_FRACTION: f32 = 0.02;

/// Minimum blob height/width ratio
const MIN_ASPECT_RATIO: f32 = 0.5;

/// Classify a mouth-region crop as a yawn candidate
///
/// The largest connected dark blob must exceed 2% of the face area and be at
/// least half as tall as it is wide. Returns `false` for empty crops or a
/// degenerate face box.
pub fn yawn_heuristic(mouth_region: &VideoFrame, face_width: u32, face_height: u32) -> bool {
    let face_area = face_width as f32 * face_height as f32;
    if face_area <= 0.0 || mouth_region.width == 0 || mouth_region.height == 0 {
        return false;
    }

    let gray = mouth_region.to_grayscale();
    let binary = threshold(&gray, CAVITY_THRESHOLD, ThresholdType::BinaryInverted);
    let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

    // Area and bounding box per label, skipping background (label 0)
    let mut blobs: std::collections::HashMap<u32, (u32, u32, u32, u32, u32)> =
        std::collections::HashMap::new();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel.0[0];
        if label == 0 {
            continue;
        }
        let entry = blobs.entry(label).or_insert((0, x, x, y, y));
        entry.0 += 1;
        entry.1 = entry.1.min(x);
        entry.2 = entry.2.max(x);
        entry.3 = entry.3.min(y);
        entry.4 = entry.4.max(y);
    }

    let Some((area, min_x, max_x, min_y, max_y)) = blobs.values().max_by_key(|b| b.0).copied()
    else {
        return false;
    };

    let blob_width = (max_x - min_x + 1) as f32;
    let blob_height = (max_y - min_y + 1) as f32;
    let aspect = blob_height / blob_width;

    area as f32 > face_area * MIN_AREA_FRACTION && aspect > MIN_ASPECT_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bright mouth crop with a dark rectangle of the given size at (10, 10)
    fn crop_with_cavity(w: u32, h: u32, cavity_w: u32, cavity_h: u32) -> VideoFrame {
        let mut frame = VideoFrame::filled(w, h, [200, 200, 200]);
        for y in 10..(10 + cavity_h).min(h) {
            for x in 10..(10 + cavity_w).min(w) {
                let idx = ((y * w + x) * 3) as usize;
                frame.data[idx] = 20;
                frame.data[idx + 1] = 20;
                frame.data[idx + 2] = 20;
            }
        }
        frame
    }

    #[test]
    fn test_open_mouth_detected() {
        // 30x20 cavity: 600px > 2% of 100x100 face, aspect 0.66 > 0.5
        let crop = crop_with_cavity(100, 60, 30, 20);
        assert!(yawn_heuristic(&crop, 100, 100));
    }

    #[test]
    fn test_uniform_region_is_not_a_yawn() {
        let crop = VideoFrame::filled(100, 60, [200, 200, 200]);
        assert!(!yawn_heuristic(&crop, 100, 100));
    }

    #[test]
    fn test_flat_blob_rejected_by_aspect() {
        // Big but flat: 60x10 -> aspect 0.16
        let crop = crop_with_cavity(100, 60, 60, 10);
        assert!(!yawn_heuristic(&crop, 100, 100));
    }

    #[test]
    fn test_small_blob_rejected_by_area() {
        // 10x8 = 80px < 200px minimum for a 100x100 face
        let crop = crop_with_cavity(100, 60, 10, 8);
        assert!(!yawn_heuristic(&crop, 100, 100));
    }

    #[test]
    fn test_degenerate_inputs() {
        let crop = crop_with_cavity(100, 60, 30, 20);
        assert!(!yawn_heuristic(&crop, 0, 0));
    }
}
