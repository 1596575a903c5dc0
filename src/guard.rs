//! Typing guard
//!
//! Latch that keeps timed polls from refreshing the inbox while the user
//! has unsent text. It never times out: an abandoned draft keeps polling
//! suppressed until it is cleared or sent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Capability the scheduler queries before a timed poll
pub trait PollGate: Send + Sync {
    fn suppresses_polling(&self) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct TypingGuard {
    engaged: Arc<AtomicBool>,
}

impl TypingGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engage(&self) {
        self.engaged.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.engaged.store(false, Ordering::SeqCst);
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }

    /// Track a draft edit: non-empty text engages, empty text releases
    pub fn track(&self, draft: &str) {
        if draft.is_empty() {
            self.release();
        } else {
            self.engage();
        }
    }
}

impl PollGate for TypingGuard {
    fn suppresses_polling(&self) -> bool {
        self.is_engaged()
    }
}
