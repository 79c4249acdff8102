//! Rule-match counter.
//!
//! Incremented from match-event notifications that arrive independently
//! of compilation; read-mostly, eventually consistent with live traffic.
//! Process-lifetime state, so a restart resets it to zero.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counts observed rule-match events.
#[derive(Debug, Clone, Default)]
pub struct MatchCounter {
    count: Arc<AtomicU64>,
}

impl MatchCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}
