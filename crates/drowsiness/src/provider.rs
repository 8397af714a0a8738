//! Landmark provider capability and startup fallback chain
//!
//! Backends differ wildly in fidelity and dependencies, so the pipeline only
//! ever sees the `LandmarkProvider` trait. Selection happens exactly once per
//! session: candidates are probed in fixed priority order and the first one
//! whose runtime dependency is present wins. There is no per-frame
//! re-selection and no silent no-op mode.

use crate::backends::{CascadeFactory, FaceMeshFactory, OnnxLandmarkFactory};
use crate::config::{DetectionConfig, DetectorPreference};
use crate::landmarks::LandmarkSet;
use crate::DetectionError;
use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Backend fidelity tier, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderTier {
    /// 68-point landmark regressor
    HighFidelity,
    /// Face-mesh model (lighter, fewer usable points)
    Light,
    /// Cascade face boxes plus region heuristics
    Fallback,
}

impl fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderTier::HighFidelity => write!(f, "high-fidelity"),
            ProviderTier::Light => write!(f, "light"),
            ProviderTier::Fallback => write!(f, "fallback"),
        }
    }
}

impl ProviderTier {
    /// Whether the given preference permits this tier
    pub fn permitted_by(&self, preference: DetectorPreference) -> bool {
        match preference {
            DetectorPreference::Auto => true,
            DetectorPreference::HighFidelity => *self == ProviderTier::HighFidelity,
            DetectorPreference::Light => *self == ProviderTier::Light,
            DetectorPreference::Fallback => *self == ProviderTier::Fallback,
        }
    }
}

/// A backend that turns a raw frame into landmark or region data
///
/// Returning `Ok(None)` means no face was visible this frame. Errors are
/// per-frame-recoverable; the pipeline absorbs them.
pub trait LandmarkProvider: Send {
    fn tier(&self) -> ProviderTier;

    fn extract_landmarks(
        &mut self,
        frame: &VideoFrame,
    ) -> Result<Option<LandmarkSet>, DetectionError>;
}

/// Constructs one backend tier, with a cheap availability probe
///
/// The probe checks the runtime dependency (model file) without paying the
/// full load cost; `build` performs the actual load and may still fail.
pub trait ProviderFactory {
    fn tier(&self) -> ProviderTier;

    /// Whether this tier's runtime dependency appears to be present
    fn probe(&self) -> bool;

    fn build(&self) -> Result<Box<dyn LandmarkProvider>, DetectionError>;
}

/// Select the active provider from a priority-ordered candidate list
///
/// A candidate that probes available but fails to build is logged and
/// skipped, continuing down the chain. Fails with `NoProviderAvailable`
/// only when every permitted candidate is out, which is the one
/// initialization-fatal error the caller must surface.
pub fn select_provider(
    candidates: &[Box<dyn ProviderFactory>],
    preference: DetectorPreference,
) -> Result<Box<dyn LandmarkProvider>, DetectionError> {
    for candidate in candidates {
        if !candidate.tier().permitted_by(preference) {
            continue;
        }
        if !candidate.probe() {
            warn!("Detection backend {} unavailable, trying next", candidate.tier());
            continue;
        }
        match candidate.build() {
            Ok(provider) => {
                info!("Using {} detection backend", provider.tier());
                return Ok(provider);
            }
            Err(e) => {
                warn!("Backend {} failed to initialize: {}", candidate.tier(), e);
            }
        }
    }

    Err(DetectionError::NoProviderAvailable)
}

/// The production candidate chain, highest fidelity first
pub fn default_chain(config: &DetectionConfig) -> Vec<Box<dyn ProviderFactory>> {
    vec![
        Box::new(OnnxLandmarkFactory::new(config.landmark_model_path.clone())),
        Box::new(FaceMeshFactory::new(config.mesh_model_path.clone())),
        Box::new(CascadeFactory::new(config.cascade_model_path.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider(ProviderTier);

    impl LandmarkProvider for StubProvider {
        fn tier(&self) -> ProviderTier {
            self.0
        }

        fn extract_landmarks(
            &mut self,
            _frame: &VideoFrame,
        ) -> Result<Option<LandmarkSet>, DetectionError> {
            Ok(None)
        }
    }

    struct StubFactory {
        tier: ProviderTier,
        available: bool,
        build_fails: bool,
    }

    impl StubFactory {
        fn boxed(tier: ProviderTier, available: bool) -> Box<dyn ProviderFactory> {
            Box::new(Self {
                tier,
                available,
                build_fails: false,
            })
        }
    }

    impl ProviderFactory for StubFactory {
        fn tier(&self) -> ProviderTier {
            self.tier
        }

        fn probe(&self) -> bool {
            self.available
        }

        fn build(&self) -> Result<Box<dyn LandmarkProvider>, DetectionError> {
            if self.build_fails {
                Err(DetectionError::ModelLoad("corrupt model".into()))
            } else {
                Ok(Box::new(StubProvider(self.tier)))
            }
        }
    }

    fn chain(high: bool, light: bool, fallback: bool) -> Vec<Box<dyn ProviderFactory>> {
        vec![
            StubFactory::boxed(ProviderTier::HighFidelity, high),
            StubFactory::boxed(ProviderTier::Light, light),
            StubFactory::boxed(ProviderTier::Fallback, fallback),
        ]
    }

    #[test]
    fn test_highest_available_tier_wins() {
        let provider = select_provider(&chain(true, true, true), DetectorPreference::Auto).unwrap();
        assert_eq!(provider.tier(), ProviderTier::HighFidelity);
    }

    #[test]
    fn test_falls_through_to_cascade() {
        let provider =
            select_provider(&chain(false, false, true), DetectorPreference::Auto).unwrap();
        assert_eq!(provider.tier(), ProviderTier::Fallback);
    }

    #[test]
    fn test_no_backend_is_fatal() {
        let result = select_provider(&chain(false, false, false), DetectorPreference::Auto);
        assert!(matches!(result, Err(DetectionError::NoProviderAvailable)));
    }

    #[test]
    fn test_preference_pins_the_tier() {
        let provider =
            select_provider(&chain(true, true, true), DetectorPreference::Light).unwrap();
        assert_eq!(provider.tier(), ProviderTier::Light);

        // A pinned tier that is unavailable does not fall back
        let result = select_provider(&chain(true, false, true), DetectorPreference::Light);
        assert!(matches!(result, Err(DetectionError::NoProviderAvailable)));
    }

    #[test]
    fn test_build_failure_continues_down_chain() {
        let candidates: Vec<Box<dyn ProviderFactory>> = vec![
            Box::new(StubFactory {
                tier: ProviderTier::HighFidelity,
                available: true,
                build_fails: true,
            }),
            StubFactory::boxed(ProviderTier::Fallback, true),
        ];
        let provider = select_provider(&candidates, DetectorPreference::Auto).unwrap();
        assert_eq!(provider.tier(), ProviderTier::Fallback);
    }

    #[test]
    fn test_default_chain_without_models_is_empty_handed() {
        let config = DetectionConfig::default();
        let result = select_provider(&default_chain(&config), DetectorPreference::Auto);
        assert!(matches!(result, Err(DetectionError::NoProviderAvailable)));
    }
}
