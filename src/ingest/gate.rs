//! In-process run gate.
//!
//! At most one import run per process. This is advisory only; separate
//! processes are kept apart by the per-item claim, not by this flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RunGate {
    running: Arc<AtomicBool>,
}

/// Proof that the gate is held. Dropping it releases the gate.
#[derive(Debug)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate, or `None` if a run is already in progress.
    pub fn try_start(&self) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
