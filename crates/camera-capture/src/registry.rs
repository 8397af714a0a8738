//! Exclusive camera device claims
//!
//! One physical camera can back at most one monitoring session. The registry
//! is an explicit object shared by whoever spawns sessions; there is no
//! process-wide static, so independent registries (and tests) never interfere.

use crate::CameraError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Tracks which camera indices are currently in use
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    claimed: Arc<Mutex<HashSet<u32>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a camera index for exclusive use
    ///
    /// Fails fast with `CameraError::Busy` if the index is already claimed,
    /// rather than queueing behind the current owner.
    pub fn claim(&self, index: u32) -> Result<CameraClaim, CameraError> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        if !claimed.insert(index) {
            return Err(CameraError::Busy(index));
        }
        debug!("Camera {} claimed", index);
        Ok(CameraClaim {
            index,
            claimed: Arc::clone(&self.claimed),
        })
    }

    /// Whether the given index is currently claimed
    pub fn is_claimed(&self, index: u32) -> bool {
        self.claimed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&index)
    }
}

/// RAII guard for a claimed camera; releases the index on drop
#[derive(Debug)]
pub struct CameraClaim {
    index: u32,
    claimed: Arc<Mutex<HashSet<u32>>>,
}

impl CameraClaim {
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl Drop for CameraClaim {
    fn drop(&mut self) {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        claimed.remove(&self.index);
        debug!("Camera {} released", self.index);
    }
}
