use crate::errors::{SynapseError, SynapseResult};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A single-slot guard: at most one holder at a time, a second caller is
/// rejected rather than queued.
#[derive(Debug, Clone)]
pub struct TaskSlot {
    name: &'static str,
    busy: Arc<AtomicBool>,
}

impl TaskSlot {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Take the slot. The slot is released when the permit is dropped.
    ///
    /// # Errors
    /// Returns [`SynapseError::Busy`] when the slot is already held.
    pub fn try_acquire(&self) -> SynapseResult<SlotPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SynapseError::Busy(self.name))?;
        Ok(SlotPermit {
            busy: Arc::clone(&self.busy),
        })
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct SlotPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
