//! Per-frame processing pipeline

use camera_capture::VideoFrame;
use drowsiness::{
    DecisionEngine, DetectionEvent, FrameSignal, LandmarkProvider, LandmarkSet, ProviderTier,
    SignalSource,
};
use face_metrics::{
    eye_area_ratio, eye_aspect_ratio, mouth_aspect_ratio, yawn_heuristic, FeatureSample,
};
use tracing::warn;

/// Annotated result of one pipeline cycle
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Whether a face was visible this frame
    pub face_detected: bool,
    /// Which backend tier produced the data
    pub tier: ProviderTier,
    /// Features computed this frame, if a face was visible
    pub sample: Option<FeatureSample>,
    /// Decision engine output
    pub event: DetectionEvent,
    /// A per-frame failure was absorbed; the session inserts a short pause
    pub recovered_error: bool,
}

/// One full provider -> extractor -> engine cycle per frame
///
/// The pipeline borrows each frame for exactly one `process` call and keeps
/// no per-frame state of its own; all temporal state lives in the engine.
pub struct FramePipeline {
    provider: Box<dyn LandmarkProvider>,
    engine: DecisionEngine,
}

impl FramePipeline {
    pub fn new(provider: Box<dyn LandmarkProvider>, engine: DecisionEngine) -> Self {
        Self { provider, engine }
    }

    /// The active backend tier (fixed for the pipeline's lifetime)
    pub fn tier(&self) -> ProviderTier {
        self.provider.tier()
    }

    /// Process one frame
    ///
    /// Extraction errors are logged and mapped to "no detection this frame";
    /// they never escape to the session loop as errors.
    pub fn process(&mut self, frame: &VideoFrame) -> FrameAnalysis {
        let tier = self.provider.tier();

        let (signal, recovered_error) = match self.provider.extract_landmarks(frame) {
            Ok(Some(set)) => (Some(build_signal(&set, frame)), false),
            Ok(None) => (None, false),
            Err(e) => {
                warn!(sequence = frame.sequence, "recoverable detection failure: {}", e);
                (None, true)
            }
        };

        let event = self.engine.advance(signal.as_ref());

        FrameAnalysis {
            face_detected: signal.is_some(),
            tier,
            sample: signal.map(|s| s.sample),
            event,
            recovered_error,
        }
    }

    /// Clear all temporal detection state (driver change, session reuse)
    pub fn reset(&mut self) {
        self.engine.reset();
    }
}

/// Map the provider's landmark or region data to engine input
fn build_signal(set: &LandmarkSet, frame: &VideoFrame) -> FrameSignal {
    match set {
        LandmarkSet::Landmarks(face) => {
            let ear =
                (eye_aspect_ratio(&face.left_eye) + eye_aspect_ratio(&face.right_eye)) / 2.0;
            let mar = face.mouth.as_ref().map(|m| mouth_aspect_ratio(m));
            FrameSignal {
                sample: FeatureSample::new(ear, mar),
                source: SignalSource::Landmarks,
                yawn_hint: None,
            }
        }
        LandmarkSet::Regions(regions) => {
            let ratio = eye_area_ratio(&regions.eyes, &regions.face);
            let yawn_hint = regions.mouth.and_then(|m| {
                let crop = frame.crop(m.x.max(0) as u32, m.y.max(0) as u32, m.width, m.height)?;
                Some(yawn_heuristic(
                    &crop,
                    regions.face.width,
                    regions.face.height,
                ))
            });
            FrameSignal {
                sample: FeatureSample::new(ratio, None),
                source: SignalSource::Regions,
                yawn_hint,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drowsiness::{
        DetectionConfig, DetectionError, EventKind, FaceLandmarks, RegionSet, ResetPolicy,
    };
    use face_metrics::{Point2, Rect};

    /// Provider stub fed with a canned response per frame
    struct ScriptedProvider {
        responses: std::vec::IntoIter<Result<Option<LandmarkSet>, DetectionError>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<Option<LandmarkSet>, DetectionError>>) -> Box<Self> {
            Box::new(Self {
                responses: responses.into_iter(),
            })
        }
    }

    impl LandmarkProvider for ScriptedProvider {
        fn tier(&self) -> ProviderTier {
            ProviderTier::HighFidelity
        }

        fn extract_landmarks(
            &mut self,
            _frame: &VideoFrame,
        ) -> Result<Option<LandmarkSet>, DetectionError> {
            self.responses.next().unwrap_or(Ok(None))
        }
    }

    /// Landmarks with a given uniform eye openness (vertical lid distance
    /// over a 10px-wide eye) and no mouth data
    fn landmarks_with_lid_gap(gap: f32) -> LandmarkSet {
        let eye = [
            Point2::new(0.0, 0.0),
            Point2::new(3.0, -gap / 2.0),
            Point2::new(7.0, -gap / 2.0),
            Point2::new(10.0, 0.0),
            Point2::new(7.0, gap / 2.0),
            Point2::new(3.0, gap / 2.0),
        ];
        LandmarkSet::Landmarks(FaceLandmarks {
            left_eye: eye,
            right_eye: eye,
            mouth: None,
        })
    }

    fn engine(consecutive_frames: u32) -> DecisionEngine {
        DecisionEngine::new(&DetectionConfig {
            consecutive_frames,
            reset_policy: ResetPolicy::Hard,
            ..Default::default()
        })
    }

    #[test]
    fn test_closed_eyes_debounce_through_pipeline() {
        // Lid gap 1px -> EAR 0.1, below the 0.25 default threshold
        let responses = (0..5).map(|_| Ok(Some(landmarks_with_lid_gap(1.0)))).collect();
        let mut pipeline = FramePipeline::new(ScriptedProvider::new(responses), engine(3));
        let frame = VideoFrame::filled(64, 64, [0, 0, 0]);

        let kinds: Vec<EventKind> = (0..5).map(|_| pipeline.process(&frame).event.kind).collect();
        assert_eq!(
            kinds,
            [
                EventKind::None,
                EventKind::None,
                EventKind::Drowsy,
                EventKind::Drowsy,
                EventKind::Drowsy,
            ]
        );
    }

    #[test]
    fn test_provider_error_absorbed_as_no_detection() {
        let responses = vec![
            Ok(Some(landmarks_with_lid_gap(1.0))),
            Err(DetectionError::Inference("tensor mismatch".into())),
            Ok(Some(landmarks_with_lid_gap(1.0))),
        ];
        let mut pipeline = FramePipeline::new(ScriptedProvider::new(responses), engine(2));
        let frame = VideoFrame::filled(64, 64, [0, 0, 0]);

        let first = pipeline.process(&frame);
        assert!(!first.recovered_error);

        // The failed frame counts as no-face: counters reset, error flagged
        let second = pipeline.process(&frame);
        assert!(second.recovered_error);
        assert!(!second.face_detected);
        assert_eq!(second.event.kind, EventKind::None);

        let third = pipeline.process(&frame);
        assert_eq!(third.event.kind, EventKind::None); // streak restarted
    }

    #[test]
    fn test_open_eyes_stay_quiet() {
        // Lid gap 6px -> EAR 0.6
        let responses = (0..4).map(|_| Ok(Some(landmarks_with_lid_gap(6.0)))).collect();
        let mut pipeline = FramePipeline::new(ScriptedProvider::new(responses), engine(2));
        let frame = VideoFrame::filled(64, 64, [0, 0, 0]);

        for _ in 0..4 {
            let analysis = pipeline.process(&frame);
            assert!(analysis.face_detected);
            assert_eq!(analysis.event.kind, EventKind::None);
        }
    }

    #[test]
    fn test_region_path_produces_area_ratio_sample() {
        let regions = LandmarkSet::Regions(RegionSet {
            face: Rect::new(0, 0, 100, 100),
            eyes: vec![Rect::new(20, 20, 10, 10), Rect::new(60, 20, 10, 10)],
            mouth: None,
        });
        let mut pipeline =
            FramePipeline::new(ScriptedProvider::new(vec![Ok(Some(regions))]), engine(1));
        let frame = VideoFrame::filled(128, 128, [0, 0, 0]);

        let analysis = pipeline.process(&frame);
        let sample = analysis.sample.unwrap();
        assert!((sample.ear - 0.02).abs() < 1e-6);
        assert!(sample.mar.is_none());
        // 0.02 is below the 0.10 area threshold: counts toward drowsiness
        assert_eq!(analysis.event.kind, EventKind::Drowsy);
    }
}
