//! Named monotonic counters.
//!
//! Order numbers need a per-day running sequence that stays unique when
//! several checkouts run at once, so the increment happens inside the
//! store instead of as a count-then-format step in the caller.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::Result;

/// Allocates strictly increasing values per counter name.
#[async_trait]
pub trait SequenceAllocator: Send + Sync {
    /// Atomically increments the named counter and returns the new value.
    ///
    /// The first call for a name returns 1.
    async fn next_value(&self, name: &str) -> Result<u64>;
}

/// Process-local sequence allocator.
#[derive(Debug, Clone, Default)]
pub struct InMemorySequenceAllocator {
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl InMemorySequenceAllocator {
    /// Creates an allocator with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last value handed out for a counter, if any.
    pub async fn current(&self, name: &str) -> Option<u64> {
        self.counters.lock().await.get(name).copied()
    }
}

#[async_trait]
impl SequenceAllocator for InMemorySequenceAllocator {
    async fn next_value(&self, name: &str) -> Result<u64> {
        let mut counters = self.counters.lock().await;
        let value = counters.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}
