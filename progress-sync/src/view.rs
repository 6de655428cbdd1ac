//! Liveness flag for torn-down views.
//!
//! Cancellation here means "completion is ignored, not prevented": a fetch
//! started for a view keeps running after the user navigates away, but its
//! result is discarded on arrival instead of being applied to state nobody
//! is looking at.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Liveness {
    live: Arc<AtomicBool>,
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Marks the view as gone. In-flight fetches check this before touching
    /// shared state; the network calls themselves are not aborted.
    pub fn retire(&self) {
        self.live.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retirement_is_visible_through_clones() {
        let liveness = Liveness::new();
        let held_by_callback = liveness.clone();
        assert!(held_by_callback.is_live());

        liveness.retire();
        assert!(!held_by_callback.is_live());
    }
}
