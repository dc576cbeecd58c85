use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared flag that lets one side ask long-running work to stop.
///
/// Clones observe the same flag. Workers poll [`CancelFlag::is_cancelled`]
/// between units of work; cancelling is idempotent and cannot be undone.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
