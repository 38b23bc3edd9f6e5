//! Cancellation of in-flight route requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared flag a caller flips when it no longer wants a result.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
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

/// One logical request slot, such as the route shown on a map view.
///
/// Starting a new request cancels the one it supersedes.
#[derive(Debug, Default)]
pub struct RequestSlot {
    current: Mutex<Option<CancelToken>>,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the previous request, if any, and returns a token for the next.
    pub fn begin(&self) -> CancelToken {
        let token = CancelToken::new();
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Cancels the active request, e.g. when the view goes away.
    pub fn clear(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.take() {
            previous.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_clones_share_state() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_slot_supersedes_previous() {
        let slot = RequestSlot::new();
        let first = slot.begin();
        let second = slot.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        slot.clear();
        assert!(second.is_cancelled());
    }
}
