//! RAII guard around a saved configuration.

use log::{debug, warn};

use crate::config::RecoveryMethod;
use crate::error::Result;

use super::Recoverer;

/// A saved configuration that must be restored.
///
/// Holds `&mut R` so nothing else can touch the recoverer while the device
/// runs on changed configuration. [`RecoveryPoint::restore`] may be retried
/// until it succeeds. Dropping an unrestored point logs a warning.
pub struct RecoveryPoint<'a, R: Recoverer> {
    recoverer: &'a mut R,
    method: RecoveryMethod,
    restored: bool,
}

impl<'a, R: Recoverer> RecoveryPoint<'a, R> {
    /// Save the current configuration.
    pub async fn save(recoverer: &'a mut R, method: RecoveryMethod) -> Result<Self> {
        recoverer.save(method).await?;
        debug!("Saved recovery point ({:?})", method);
        Ok(Self {
            recoverer,
            method,
            restored: false,
        })
    }

    /// Check if the configuration was restored.
    pub fn is_restored(&self) -> bool {
        self.restored
    }

    /// Restore the saved configuration.
    pub async fn restore(&mut self) -> Result<()> {
        self.recoverer.restore(self.method).await?;
        self.restored = true;
        Ok(())
    }
}

impl<R: Recoverer> Drop for RecoveryPoint<'_, R> {
    fn drop(&mut self) {
        if !self.restored {
            warn!(
                "Recovery point ({:?}) dropped without restore; device may keep the changed configuration",
                self.method
            );
        }
    }
}
