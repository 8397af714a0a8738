//! Monitoring session lifecycle
//!
//! A session is one sequential loop over one frame source: pull a frame, run
//! it fully through the pipeline, emit the event, yield. Frame N+1 never
//! starts before frame N finishes, because the engine's counters depend on
//! strict sequential history. The session owns its camera claim and releases
//! it when the loop exits.

use crate::pipeline::FramePipeline;
use crate::SessionError;
use camera_capture::{CameraClaim, DeviceRegistry, FrameSource};
use drowsiness::{
    default_chain, select_provider, DecisionEngine, DetectionConfig, DetectionEvent,
    LandmarkProvider, ProviderTier,
};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Pause after an absorbed per-frame failure, to avoid a hot error loop
/// against a misbehaving camera or provider
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Counters accumulated over one session
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SessionStats {
    /// Frames pulled and processed
    pub frames: u64,
    /// Frames that produced a drowsy or yawning event
    pub alerts: u64,
    /// Per-frame failures absorbed
    pub recovered_errors: u64,
}

/// Handle returned to the session owner
///
/// Dropping the handle does not stop the session; call `stop` (observed
/// within one frame cycle) or `wait` for the source to end naturally.
pub struct SessionHandle {
    id: Uuid,
    tier: ProviderTier,
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<SessionStats>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Which backend tier the session selected at startup
    pub fn tier(&self) -> ProviderTier {
        self.tier
    }

    /// Request the loop to stop and wait for it to finish
    pub async fn stop(self) -> SessionStats {
        let _ = self.stop_tx.send(true);
        self.join.await.unwrap_or_default()
    }

    /// Wait for the loop to finish on its own (end of stream)
    pub async fn wait(self) -> SessionStats {
        self.join.await.unwrap_or_default()
    }
}

/// Entry point for spawning monitoring sessions
pub struct MonitorSession;

impl MonitorSession {
    /// Claim the camera, select a backend through the fallback chain, and
    /// spawn the monitoring loop
    ///
    /// Fails before spawning anything if the camera index is already in use
    /// or no detection backend is available.
    pub fn spawn(
        registry: &DeviceRegistry,
        camera_index: u32,
        source: Box<dyn FrameSource>,
        config: &DetectionConfig,
        events: mpsc::Sender<DetectionEvent>,
    ) -> Result<SessionHandle, SessionError> {
        let provider = select_provider(&default_chain(config), config.detector_preference)?;
        Self::spawn_with_provider(registry, camera_index, source, provider, config, events)
    }

    /// Spawn with an already-built provider (tests, custom chains)
    pub fn spawn_with_provider(
        registry: &DeviceRegistry,
        camera_index: u32,
        source: Box<dyn FrameSource>,
        provider: Box<dyn LandmarkProvider>,
        config: &DetectionConfig,
        events: mpsc::Sender<DetectionEvent>,
    ) -> Result<SessionHandle, SessionError> {
        let claim = registry.claim(camera_index)?;
        let tier = provider.tier();
        let pipeline = FramePipeline::new(provider, DecisionEngine::new(config));
        let (stop_tx, stop_rx) = watch::channel(false);
        let id = Uuid::new_v4();

        info!(%id, %tier, camera_index, "starting monitoring session");
        let join = tokio::spawn(run_loop(id, source, pipeline, events, stop_rx, claim));

        Ok(SessionHandle {
            id,
            tier,
            stop_tx,
            join,
        })
    }
}

async fn run_loop(
    id: Uuid,
    mut source: Box<dyn FrameSource>,
    mut pipeline: FramePipeline,
    events: mpsc::Sender<DetectionEvent>,
    stop_rx: watch::Receiver<bool>,
    claim: CameraClaim,
) -> SessionStats {
    let mut stats = SessionStats::default();

    loop {
        // Stop requests are observed between frames, never mid-frame
        if *stop_rx.borrow() {
            info!(%id, "stop requested");
            break;
        }

        match source.next_frame() {
            Ok(Some(frame)) => {
                let analysis = pipeline.process(&frame);
                stats.frames += 1;
                if analysis.event.is_alert() {
                    stats.alerts += 1;
                }

                // The alerting collaborator owns delivery; a full channel
                // drops this frame's event rather than stalling the loop.
                let _ = events.try_send(analysis.event);

                if analysis.recovered_error {
                    stats.recovered_errors += 1;
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
                tokio::task::yield_now().await;
            }
            Ok(None) => {
                info!(%id, frames = stats.frames, "end of stream");
                break;
            }
            Err(e) => {
                warn!(%id, "recoverable frame read failure: {}", e);
                stats.recovered_errors += 1;
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }

    drop(claim);
    info!(
        %id,
        frames = stats.frames,
        alerts = stats.alerts,
        recovered_errors = stats.recovered_errors,
        "session finished"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::{CameraError, FrameSequence, VideoFrame};
    use drowsiness::{DetectionError, EventKind, FaceLandmarks, LandmarkSet, ResetPolicy};
    use face_metrics::Point2;

    /// Provider that always reports the same eye openness
    struct FixedEyeProvider {
        lid_gap: f32,
    }

    impl LandmarkProvider for FixedEyeProvider {
        fn tier(&self) -> ProviderTier {
            ProviderTier::Light
        }

        fn extract_landmarks(
            &mut self,
            _frame: &VideoFrame,
        ) -> Result<Option<LandmarkSet>, DetectionError> {
            let g = self.lid_gap / 2.0;
            let eye = [
                Point2::new(0.0, 0.0),
                Point2::new(3.0, -g),
                Point2::new(7.0, -g),
                Point2::new(10.0, 0.0),
                Point2::new(7.0, g),
                Point2::new(3.0, g),
            ];
            Ok(Some(LandmarkSet::Landmarks(FaceLandmarks {
                left_eye: eye,
                right_eye: eye,
                mouth: None,
            })))
        }
    }

    /// Source that never ends
    struct EndlessSource;

    impl FrameSource for EndlessSource {
        fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
            Ok(Some(VideoFrame::filled(16, 16, [0, 0, 0])))
        }
    }

    fn frames(n: usize) -> Box<FrameSequence> {
        Box::new(FrameSequence::new(
            (0..n).map(|i| VideoFrame::filled(16, 16, [i as u8, 0, 0])).collect(),
        ))
    }

    fn config(consecutive_frames: u32) -> DetectionConfig {
        DetectionConfig {
            consecutive_frames,
            reset_policy: ResetPolicy::Hard,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_end_of_stream_finishes_session() {
        let registry = DeviceRegistry::new();
        let (tx, mut rx) = mpsc::channel(16);

        let handle = MonitorSession::spawn_with_provider(
            &registry,
            0,
            frames(5),
            Box::new(FixedEyeProvider { lid_gap: 1.0 }),
            &config(3),
            tx,
        )
        .unwrap();

        let stats = handle.wait().await;
        assert_eq!(stats.frames, 5);
        assert_eq!(stats.alerts, 3); // frames 3..5 with T=3

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind);
        }
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

    #[tokio::test]
    async fn test_stop_observed_within_a_cycle() {
        let registry = DeviceRegistry::new();
        let (tx, _rx) = mpsc::channel(16);

        let handle = MonitorSession::spawn_with_provider(
            &registry,
            0,
            Box::new(EndlessSource),
            Box::new(FixedEyeProvider { lid_gap: 6.0 }),
            &config(3),
            tx,
        )
        .unwrap();

        // If stop were not observed, this would never return
        let stats = handle.stop().await;
        assert_eq!(stats.recovered_errors, 0);
    }

    #[tokio::test]
    async fn test_camera_released_after_session() {
        let registry = DeviceRegistry::new();
        let (tx, _rx) = mpsc::channel(16);

        let handle = MonitorSession::spawn_with_provider(
            &registry,
            3,
            frames(1),
            Box::new(FixedEyeProvider { lid_gap: 6.0 }),
            &config(3),
            tx.clone(),
        )
        .unwrap();
        assert_eq!(handle.tier(), ProviderTier::Light);

        handle.wait().await;
        assert!(!registry.is_claimed(3));

        // Index reusable for a fresh session
        let second = MonitorSession::spawn_with_provider(
            &registry,
            3,
            frames(1),
            Box::new(FixedEyeProvider { lid_gap: 6.0 }),
            &config(3),
            tx,
        );
        assert!(second.is_ok());
        second.unwrap().wait().await;
    }

    #[tokio::test]
    async fn test_double_claim_fails_fast() {
        let registry = DeviceRegistry::new();
        let (tx, _rx) = mpsc::channel(16);

        let first = MonitorSession::spawn_with_provider(
            &registry,
            0,
            Box::new(EndlessSource),
            Box::new(FixedEyeProvider { lid_gap: 6.0 }),
            &config(3),
            tx.clone(),
        )
        .unwrap();

        let second = MonitorSession::spawn_with_provider(
            &registry,
            0,
            Box::new(EndlessSource),
            Box::new(FixedEyeProvider { lid_gap: 6.0 }),
            &config(3),
            tx,
        );
        assert!(matches!(
            second,
            Err(SessionError::Camera(CameraError::Busy(0)))
        ));

        first.stop().await;
        assert!(!registry.is_claimed(0));
    }

    #[tokio::test]
    async fn test_spawn_without_backends_is_fatal() {
        let registry = DeviceRegistry::new();
        let (tx, _rx) = mpsc::channel(16);

        // Default config has no model paths: every tier probes unavailable
        let result = MonitorSession::spawn(
            &registry,
            0,
            frames(1),
            &DetectionConfig::default(),
            tx,
        );
        assert!(matches!(
            result,
            Err(SessionError::Detection(DetectionError::NoProviderAvailable))
        ));
        // Startup failure must not leave the camera claimed
        assert!(!registry.is_claimed(0));
    }
}
