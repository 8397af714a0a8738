//! Detection backend tiers
//!
//! Three interchangeable implementations of `LandmarkProvider`:
//! - `OnnxLandmarkProvider`: 68-point landmark regressor (high fidelity)
//! - `FaceMeshProvider`: dense face mesh, subsampled to the points we use
//! - `CascadeProvider`: SeetaFace cascade face boxes plus region heuristics
//!
//! The ONNX tiers treat the model as an opaque oracle: preprocess, run,
//! map the output coordinates onto the named landmark layout. The cascade
//! tier produces bounding boxes only and leaves ratio work to the
//! area-ratio/yawn fallback path.

use crate::landmarks::{FaceLandmarks, LandmarkSet, RegionSet};
use crate::provider::{LandmarkProvider, ProviderFactory, ProviderTier};
use crate::DetectionError;
use camera_capture::VideoFrame;
use face_metrics::{Point2, Rect};
use image::{ImageBuffer, Luma, Rgb};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::region_labelling::{connected_components, Connectivity};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 68-landmark indices for the 6-point eye contours
const LEFT_EYE_68: [usize; 6] = [36, 37, 38, 39, 40, 41];
const RIGHT_EYE_68: [usize; 6] = [42, 43, 44, 45, 46, 47];
/// Outer-lip subset ordered for the 8-point MAR layout
/// (corners at 0 and 4, vertical pairs at 2/6 and 3/7)
const MOUTH_68: [usize; 8] = [48, 49, 50, 51, 54, 59, 58, 57];

/// Face-mesh indices for the same layouts
const LEFT_EYE_MESH: [usize; 6] = [33, 160, 158, 133, 153, 144];
const RIGHT_EYE_MESH: [usize; 6] = [362, 385, 387, 263, 373, 380];
const MOUTH_MESH: [usize; 8] = [61, 81, 13, 311, 291, 178, 14, 402];

fn load_session(path: &Path) -> Result<Session, DetectionError> {
    info!("Loading detection model from {}", path.display());
    Session::builder()
        .map_err(|e| DetectionError::ModelLoad(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| DetectionError::ModelLoad(e.to_string()))?
        .commit_from_file(path)
        .map_err(|e| DetectionError::ModelLoad(e.to_string()))
}

/// Resize the frame and normalize to a (1, 3, size, size) tensor in [-1, 1]
fn frame_to_tensor(frame: &VideoFrame, size: u32) -> Result<Array4<f32>, DetectionError> {
    let img: ImageBuffer<Rgb<u8>, &[u8]> =
        ImageBuffer::from_raw(frame.width, frame.height, frame.data.as_slice()).ok_or_else(
            || DetectionError::ImageProcessing("frame buffer does not match dimensions".into()),
        )?;

    let resized = image::imageops::resize(
        &img,
        size,
        size,
        image::imageops::FilterType::Triangle,
    );

    let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = (pixel[0] as f32 / 127.5) - 1.0;
        input[[0, 1, y as usize, x as usize]] = (pixel[1] as f32 / 127.5) - 1.0;
        input[[0, 2, y as usize, x as usize]] = (pixel[2] as f32 / 127.5) - 1.0;
    }
    Ok(input)
}

fn gather<const N: usize>(points: &[Point2], indices: &[usize; N]) -> Option<[Point2; N]> {
    let mut out = [Point2::new(0.0, 0.0); N];
    for (slot, &idx) in out.iter_mut().zip(indices.iter()) {
        *slot = *points.get(idx)?;
    }
    Some(out)
}

/// Reject landmark sets whose geometry cannot be a real face
///
/// A collapsed or off-frame point cloud means the regressor ran without a
/// face in view; that frame is reported as no-face, not as closed eyes.
fn plausible_face(points: &[Point2], frame: &VideoFrame) -> bool {
    let mut min_x = f32::MAX;
    let mut max_x = f32::MIN;
    let mut min_y = f32::MAX;
    let mut max_y = f32::MIN;
    for p in points {
        if !p.x.is_finite() || !p.y.is_finite() {
            return false;
        }
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    let span_x = max_x - min_x;
    let span_y = max_y - min_y;
    span_x > frame.width as f32 * 0.02 && span_y > frame.height as f32 * 0.02
}

/// High-fidelity tier: 68-point landmark regressor over ONNX
pub struct OnnxLandmarkProvider {
    session: Session,
    input_size: u32,
}

impl OnnxLandmarkProvider {
    pub fn new(model_path: &Path) -> Result<Self, DetectionError> {
        Ok(Self {
            session: load_session(model_path)?,
            input_size: 112,
        })
    }

    /// Run the regressor and map its flat (x, y) output to frame pixels
    fn infer_points(&mut self, frame: &VideoFrame) -> Result<Vec<Point2>, DetectionError> {
        let input = frame_to_tensor(frame, self.input_size)?;
        let outputs = self
            .session
            .run(ort::inputs![input].map_err(|e| DetectionError::Inference(e.to_string()))?)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let view = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let flat: Vec<f32> = view.iter().copied().collect();
        if flat.len() < 136 {
            return Err(DetectionError::Inference(format!(
                "landmark output too short: {} values",
                flat.len()
            )));
        }

        // Coordinates are normalized to [0, 1] over the model input crop
        Ok(flat
            .chunks(2)
            .take(68)
            .map(|xy| Point2::new(xy[0] * frame.width as f32, xy[1] * frame.height as f32))
            .collect())
    }
}

impl LandmarkProvider for OnnxLandmarkProvider {
    fn tier(&self) -> ProviderTier {
        ProviderTier::HighFidelity
    }

    fn extract_landmarks(
        &mut self,
        frame: &VideoFrame,
    ) -> Result<Option<LandmarkSet>, DetectionError> {
        let points = self.infer_points(frame)?;
        if !plausible_face(&points, frame) {
            return Ok(None);
        }

        let left_eye = gather(&points, &LEFT_EYE_68);
        let right_eye = gather(&points, &RIGHT_EYE_68);
        let mouth = gather(&points, &MOUTH_68);

        match (left_eye, right_eye) {
            (Some(left_eye), Some(right_eye)) => Ok(Some(LandmarkSet::Landmarks(FaceLandmarks {
                left_eye,
                right_eye,
                mouth,
            }))),
            _ => Ok(None),
        }
    }
}

/// Light tier: dense face mesh subsampled to the 6/8-point layouts
pub struct FaceMeshProvider {
    session: Session,
    input_size: u32,
}

impl FaceMeshProvider {
    /// Minimum mesh size we can subsample (indices go up to 402)
    const MIN_MESH_POINTS: usize = 468;

    pub fn new(model_path: &Path) -> Result<Self, DetectionError> {
        Ok(Self {
            session: load_session(model_path)?,
            input_size: 192,
        })
    }

    fn infer_points(&mut self, frame: &VideoFrame) -> Result<Vec<Point2>, DetectionError> {
        let input = frame_to_tensor(frame, self.input_size)?;
        let outputs = self
            .session
            .run(ort::inputs![input].map_err(|e| DetectionError::Inference(e.to_string()))?)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let view = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let flat: Vec<f32> = view.iter().copied().collect();
        if flat.len() < Self::MIN_MESH_POINTS * 3 {
            return Err(DetectionError::Inference(format!(
                "mesh output too short: {} values",
                flat.len()
            )));
        }

        // Mesh emits (x, y, z) triples in input-crop pixel scale
        let scale_x = frame.width as f32 / self.input_size as f32;
        let scale_y = frame.height as f32 / self.input_size as f32;
        Ok(flat
            .chunks(3)
            .take(Self::MIN_MESH_POINTS)
            .map(|xyz| Point2::new(xyz[0] * scale_x, xyz[1] * scale_y))
            .collect())
    }
}

impl LandmarkProvider for FaceMeshProvider {
    fn tier(&self) -> ProviderTier {
        ProviderTier::Light
    }

    fn extract_landmarks(
        &mut self,
        frame: &VideoFrame,
    ) -> Result<Option<LandmarkSet>, DetectionError> {
        let points = self.infer_points(frame)?;
        if !plausible_face(&points, frame) {
            return Ok(None);
        }

        let left_eye = gather(&points, &LEFT_EYE_MESH);
        let right_eye = gather(&points, &RIGHT_EYE_MESH);
        let mouth = gather(&points, &MOUTH_MESH);

        match (left_eye, right_eye) {
            (Some(left_eye), Some(right_eye)) => Ok(Some(LandmarkSet::Landmarks(FaceLandmarks {
                left_eye,
                right_eye,
                mouth,
            }))),
            _ => Ok(None),
        }
    }
}

/// Fallback tier: cascade face detection plus region heuristics
///
/// No landmarks are produced; downstream uses the area-ratio and contour
/// yawn fallbacks instead. The least reliable tier, kept because it runs
/// with nothing but the cascade model file present.
pub struct CascadeProvider {
    model: rustface::Model,
}

impl CascadeProvider {
    /// Pixels darker than this are pupil/iris candidates
    const PUPIL_THRESHOLD: u8 = 80;

    pub fn new(model_path: &Path) -> Result<Self, DetectionError> {
        info!("Loading cascade model from {}", model_path.display());
        let data = fs::read(model_path)
            .map_err(|e| DetectionError::ModelLoad(format!("{}: {}", model_path.display(), e)))?;
        let model = rustface::read_model(std::io::Cursor::new(data))
            .map_err(|e| DetectionError::ModelLoad(e.to_string()))?;
        Ok(Self { model })
    }

    fn detect_face(&self, frame: &VideoFrame) -> Option<Rect> {
        let gray = frame.to_grayscale();
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(40);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(
            gray.as_raw(),
            frame.width,
            frame.height,
        ));

        faces
            .iter()
            .max_by_key(|f| f.bbox().width() as u64 * f.bbox().height() as u64)
            .map(|f| {
                let bbox = f.bbox();
                clamp_to_frame(
                    Rect::new(bbox.x(), bbox.y(), bbox.width(), bbox.height()),
                    frame,
                )
            })
    }

    /// Find up to two pupil-sized dark blobs in the upper half of the face
    fn detect_eyes(&self, frame: &VideoFrame, face: &Rect) -> Vec<Rect> {
        let half_height = face.height / 2;
        let Some(upper) = frame.crop(
            face.x.max(0) as u32,
            face.y.max(0) as u32,
            face.width,
            half_height,
        ) else {
            return Vec::new();
        };

        let gray = upper.to_grayscale();
        let binary = threshold(&gray, Self::PUPIL_THRESHOLD, ThresholdType::BinaryInverted);
        let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

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

        // Pupil blobs occupy a narrow size band relative to the face
        let face_area = face.area() as f32;
        let min_area = (face_area * 0.002) as u32;
        let max_area = (face_area * 0.03) as u32;

        let mut candidates: Vec<(u32, Rect)> = blobs
            .values()
            .filter(|(area, ..)| *area >= min_area.max(1) && *area <= max_area)
            .map(|&(area, min_x, max_x, min_y, max_y)| {
                (
                    area,
                    Rect::new(
                        face.x + min_x as i32,
                        face.y + min_y as i32,
                        max_x - min_x + 1,
                        max_y - min_y + 1,
                    ),
                )
            })
            .collect();

        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates.truncate(2);
        candidates.into_iter().map(|(_, rect)| rect).collect()
    }
}

fn clamp_to_frame(rect: Rect, frame: &VideoFrame) -> Rect {
    let x = rect.x.clamp(0, frame.width.saturating_sub(1) as i32);
    let y = rect.y.clamp(0, frame.height.saturating_sub(1) as i32);
    let width = rect.width.min(frame.width - x as u32);
    let height = rect.height.min(frame.height - y as u32);
    Rect::new(x, y, width, height)
}

impl LandmarkProvider for CascadeProvider {
    fn tier(&self) -> ProviderTier {
        ProviderTier::Fallback
    }

    fn extract_landmarks(
        &mut self,
        frame: &VideoFrame,
    ) -> Result<Option<LandmarkSet>, DetectionError> {
        let Some(face) = self.detect_face(frame) else {
            return Ok(None);
        };

        let eyes = self.detect_eyes(frame, &face);
        debug!(
            face_w = face.width,
            face_h = face.height,
            eyes = eyes.len(),
            "cascade regions"
        );

        // Mouth search region is the lower half of the face box
        let half_height = face.height / 2;
        let mouth = (half_height > 0).then(|| {
            Rect::new(
                face.x,
                face.y + half_height as i32,
                face.width,
                face.height - half_height,
            )
        });

        Ok(Some(LandmarkSet::Regions(RegionSet { face, eyes, mouth })))
    }
}

/// Factory for the high-fidelity tier
pub struct OnnxLandmarkFactory {
    model_path: Option<PathBuf>,
}

impl OnnxLandmarkFactory {
    pub fn new(model_path: Option<PathBuf>) -> Self {
        Self { model_path }
    }
}

impl ProviderFactory for OnnxLandmarkFactory {
    fn tier(&self) -> ProviderTier {
        ProviderTier::HighFidelity
    }

    fn probe(&self) -> bool {
        self.model_path.as_deref().is_some_and(Path::exists)
    }

    fn build(&self) -> Result<Box<dyn LandmarkProvider>, DetectionError> {
        let path = self
            .model_path
            .as_deref()
            .ok_or_else(|| DetectionError::Config("landmark model path not set".into()))?;
        Ok(Box::new(OnnxLandmarkProvider::new(path)?))
    }
}

/// Factory for the light (face-mesh) tier
pub struct FaceMeshFactory {
    model_path: Option<PathBuf>,
}

impl FaceMeshFactory {
    pub fn new(model_path: Option<PathBuf>) -> Self {
        Self { model_path }
    }
}

impl ProviderFactory for FaceMeshFactory {
    fn tier(&self) -> ProviderTier {
        ProviderTier::Light
    }

    fn probe(&self) -> bool {
        self.model_path.as_deref().is_some_and(Path::exists)
    }

    fn build(&self) -> Result<Box<dyn LandmarkProvider>, DetectionError> {
        let path = self
            .model_path
            .as_deref()
            .ok_or_else(|| DetectionError::Config("mesh model path not set".into()))?;
        Ok(Box::new(FaceMeshProvider::new(path)?))
    }
}

/// Factory for the cascade fallback tier
pub struct CascadeFactory {
    model_path: Option<PathBuf>,
}

impl CascadeFactory {
    pub fn new(model_path: Option<PathBuf>) -> Self {
        Self { model_path }
    }
}

impl ProviderFactory for CascadeFactory {
    fn tier(&self) -> ProviderTier {
        ProviderTier::Fallback
    }

    fn probe(&self) -> bool {
        self.model_path.as_deref().is_some_and(Path::exists)
    }

    fn build(&self) -> Result<Box<dyn LandmarkProvider>, DetectionError> {
        let path = self
            .model_path
            .as_deref()
            .ok_or_else(|| DetectionError::Config("cascade model path not set".into()))?;
        Ok(Box::new(CascadeProvider::new(path)?))
    }
}
