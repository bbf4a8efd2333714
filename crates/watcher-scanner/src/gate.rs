//! Admission Gate: bounds how many browser sessions run at once.
//!
//! Each scan holds a whole Chromium process, so the gate is sized from the
//! host memory budget. Waiters are admitted in arrival order. Permits are
//! scoped: dropping an [`AdmissionPermit`] returns it, whichever way the scan
//! ends.

use crate::error::{Result, ScanError};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use watcher_core::AdmissionConfig;

/// Bounded counting semaphore shared by every scan of an engine.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    /// A gate with `capacity` permits. Zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            tracing::warn!("Admission gate capacity 0 is unusable, using 1");
            1
        } else {
            capacity
        };
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// A gate sized from the admission configuration.
    #[must_use]
    pub fn from_config(config: &AdmissionConfig) -> Self {
        let gate = Self::new(config.capacity());
        tracing::info!("Admission gate sized to {} concurrent scans", gate.capacity);
        gate
    }

    /// Wait for a free permit.
    pub async fn acquire(&self) -> Result<AdmissionPermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ScanError::AdmissionClosed)?;
        tracing::debug!(
            "Admission permit acquired ({} of {} free)",
            self.available(),
            self.capacity
        );
        Ok(AdmissionPermit { _permit: permit })
    }

    /// Return a permit early. Equivalent to dropping it.
    pub fn release(&self, permit: AdmissionPermit) {
        permit.release();
    }

    /// Configured number of permits.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Proof of admission; returns its permit when dropped.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    /// Give the permit back to its gate.
    pub fn release(self) {
        drop(self);
    }
}
