//! Replay a synthetic clip through a full monitoring session.
//!
//! Runs entirely offline with the scripted frame source, so no camera is
//! needed. With no model paths configured the chain reports that no backend
//! is available; point the model path settings at real files to exercise
//! the detection tiers.
//!
//! ```sh
//! MONITOR_DETECTION__CASCADE_MODEL_PATH=models/seeta_fd.bin \
//!     cargo run -p monitor-session --example monitor
//! ```

use anyhow::Context;
use camera_capture::{DeviceRegistry, FrameSequence, VideoFrame};
use drowsiness::DetectionError;
use monitor_session::{MonitorSession, MonitorSettings, SessionError};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let settings = MonitorSettings::load(None).context("loading settings")?;
    info!(?settings.camera, "settings loaded");

    let registry = DeviceRegistry::new();
    let (events_tx, mut events_rx) = mpsc::channel(64);

    // Ten seconds of dark frames at the configured rate
    let frame_count = (settings.camera.fps * 10) as usize;
    let source = Box::new(FrameSequence::new(
        (0..frame_count)
            .map(|_| VideoFrame::filled(settings.camera.width, settings.camera.height, [20, 20, 20]))
            .collect(),
    ));

    let handle = match MonitorSession::spawn(
        &registry,
        settings.camera.index,
        source,
        &settings.detection,
        events_tx,
    ) {
        Ok(handle) => handle,
        Err(SessionError::Detection(DetectionError::NoProviderAvailable)) => {
            error!("no detection backend available; set a model path and retry");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    info!(id = %handle.id(), tier = %handle.tier(), "session running");

    let printer = tokio::spawn(async move {
        let mut alerts = alerting::AlertManager::default();
        while let Some(event) = events_rx.recv().await {
            if let Some(record) = alerts.ingest(&event) {
                info!(
                    id = %record.id,
                    kind = ?record.kind,
                    severity = ?record.severity,
                    "{}",
                    record.description
                );
            }
        }
    });

    let stats = handle.wait().await;
    drop(printer);
    info!(
        frames = stats.frames,
        alerts = stats.alerts,
        recovered_errors = stats.recovered_errors,
        "session complete"
    );
    Ok(())
}
