//! Settings loading and validation
//!
//! Layered in ascending precedence: built-in defaults, then an optional TOML
//! file, then `MONITOR_*` environment variables (nested keys separated with
//! `__`, e.g. `MONITOR_DETECTION__EAR_THRESHOLD=0.22`).

use crate::SessionError;
use camera_capture::CameraConfig;
use config::{Config, Environment, File};
use drowsiness::DetectionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Camera selection and capture geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let defaults = CameraConfig::default();
        Self {
            index: defaults.index,
            width: defaults.width,
            height: defaults.height,
            fps: defaults.fps,
        }
    }
}

impl From<&CameraSettings> for CameraConfig {
    fn from(settings: &CameraSettings) -> Self {
        Self {
            index: settings.index,
            width: settings.width,
            height: settings.height,
            fps: settings.fps,
        }
    }
}

/// Top-level settings for the monitoring service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub camera: CameraSettings,
    pub detection: DetectionConfig,
}

impl MonitorSettings {
    /// Load from defaults, an optional file, and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, SessionError> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&Self::default())
                .map_err(|e| SessionError::Settings(e.to_string()))?,
        );

        if let Some(path) = path {
            info!("Loading settings from {}", path.display());
            builder = builder.add_source(File::from(path));
        }

        let settings: Self = builder
            .add_source(Environment::with_prefix("MONITOR").separator("__"))
            .build()
            .map_err(|e| SessionError::Settings(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SessionError::Settings(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values outside their operating ranges
    pub fn validate(&self) -> Result<(), SessionError> {
        let d = &self.detection;
        if !(0.1..=0.8).contains(&d.ear_threshold) {
            return Err(SessionError::Settings(format!(
                "ear_threshold {} outside 0.1..=0.8",
                d.ear_threshold
            )));
        }
        if !(0.01..=0.5).contains(&d.area_ratio_threshold) {
            return Err(SessionError::Settings(format!(
                "area_ratio_threshold {} outside 0.01..=0.5",
                d.area_ratio_threshold
            )));
        }
        if !(0.1..=50.0).contains(&d.mouth_threshold) {
            return Err(SessionError::Settings(format!(
                "mouth_threshold {} outside 0.1..=50.0",
                d.mouth_threshold
            )));
        }
        if !(1..=100).contains(&d.consecutive_frames) {
            return Err(SessionError::Settings(format!(
                "consecutive_frames {} outside 1..=100",
                d.consecutive_frames
            )));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(SessionError::Settings(
                "camera dimensions must be nonzero".to_string(),
            ));
        }
        if self.camera.fps == 0 {
            return Err(SessionError::Settings(
                "camera fps must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drowsiness::DetectorPreference;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = MonitorSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.camera.index, 0);
        assert_eq!(settings.detection.consecutive_frames, 30);
    }

    #[test]
    fn test_load_without_file_yields_defaults() {
        let settings = MonitorSettings::load(None).unwrap();
        assert!((settings.detection.ear_threshold - 0.25).abs() < 1e-6);
        assert_eq!(
            settings.detection.detector_preference,
            DetectorPreference::Auto
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("monitor-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("monitor.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[camera]\nindex = 2\n\n[detection]\near_threshold = 0.21\ndetector_preference = \"fallback\"\n"
        )
        .unwrap();

        let settings = MonitorSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.camera.index, 2);
        assert!((settings.detection.ear_threshold - 0.21).abs() < 1e-6);
        assert_eq!(
            settings.detection.detector_preference,
            DetectorPreference::Fallback
        );
        // Untouched keys keep their defaults
        assert_eq!(settings.detection.consecutive_frames, 30);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let mut settings = MonitorSettings::default();
        settings.detection.ear_threshold = 0.95;
        assert!(matches!(
            settings.validate(),
            Err(SessionError::Settings(_))
        ));
    }

    #[test]
    fn test_zero_debounce_window_rejected() {
        let mut settings = MonitorSettings::default();
        settings.detection.consecutive_frames = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_fps_rejected() {
        let mut settings = MonitorSettings::default();
        settings.camera.fps = 0;
        assert!(settings.validate().is_err());
    }
}
