//! Progress bookkeeping shared by the upload and sync operations.
//!
//! Progress is a coarse 0-100 value. When an operation finishes, the bar is
//! left at its final value for a short delay and then decays back to 0. A
//! generation counter keeps a pending decay from resetting a bar that a newer
//! operation has already taken over.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::watch;

/// Percentage of `completed` out of `total`, clamped to 0..=100.
#[must_use]
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let value = completed.min(total) * 100 / total;
    u8::try_from(value).unwrap_or(100)
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Generation(Arc<AtomicU64>);

impl Generation {
    /// Start a new generation and return its number.
    pub(crate) fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.0.load(Ordering::SeqCst) == generation
    }
}

/// Apply `reset` to the state after `delay`, unless an operation newer than
/// `owner` has started in the meantime.
pub(crate) fn schedule_reset<S>(
    state: &Arc<watch::Sender<S>>,
    generation: &Generation,
    owner: u64,
    delay: Duration,
    reset: fn(&mut S),
) where
    S: Send + Sync + 'static,
{
    if !generation.is_current(owner) {
        return;
    }
    if delay.is_zero() {
        state.send_modify(reset);
        return;
    }
    let state = Arc::clone(state);
    let generation = generation.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if generation.is_current(owner) {
            state.send_modify(reset);
        }
    });
}

/// Applies `finish` to the state when dropped, so a busy flag is cleared on
/// every exit path, including a caller dropping the future mid-request.
pub(crate) struct FinishGuard<S> {
    state: Arc<watch::Sender<S>>,
    finish: fn(&mut S),
    owner: Option<(Generation, u64)>,
}

impl<S> FinishGuard<S> {
    pub(crate) fn new(state: &Arc<watch::Sender<S>>, finish: fn(&mut S)) -> Self {
        Self {
            state: Arc::clone(state),
            finish,
            owner: None,
        }
    }

    /// Only finish while `owner` is still the current generation. A call
    /// that was cancelled or overtaken leaves the state to its successor.
    pub(crate) fn owned_by(mut self, generation: &Generation, owner: u64) -> Self {
        self.owner = Some((generation.clone(), owner));
        self
    }
}

impl<S> Drop for FinishGuard<S> {
    fn drop(&mut self) {
        if let Some((generation, owner)) = &self.owner {
            if !generation.is_current(*owner) {
                return;
            }
        }
        self.state.send_modify(self.finish);
    }
}
