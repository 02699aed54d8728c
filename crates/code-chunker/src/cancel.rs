use crate::error::{ChunkerError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared cancellation signal with an optional deadline.
///
/// Clones observe the same flag, so a caller can hand one clone to every unit task and
/// cancel them all at once. Checks are cooperative: work stops at the next phase boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same flag, additionally tripped once `deadline` passes
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fail with [`ChunkerError::Cancelled`] once cancelled or past the deadline
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ChunkerError::Cancelled);
        }
        Ok(())
    }
}
