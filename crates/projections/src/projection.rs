//! Projection and read model traits.

use async_trait::async_trait;
use event_store::EventEnvelope;

use crate::Result;

/// How far into the global stream a projection has read.
///
/// Catch-up compares this against the index of each streamed event, so a
/// projection never sees the same event twice between resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub events_seen: u64,
}

impl Checkpoint {
    pub fn start() -> Self {
        Self::default()
    }

    pub fn next(self) -> Self {
        Self {
            events_seen: self.events_seen + 1,
        }
    }

    /// Whether the event at 1-based `index` in the global stream was already handled.
    pub fn has_seen(&self, index: u64) -> bool {
        index <= self.events_seen
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "checkpoint@{}", self.events_seen)
    }
}

/// Folds stored events into a query-side view.
///
/// `handle` is called for every event in the global stream, including ones
/// for aggregates the projection ignores; those still move the checkpoint.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    async fn checkpoint(&self) -> Checkpoint;

    /// Drops all derived state and rewinds to [`Checkpoint::start`].
    async fn reset(&self) -> Result<()>;
}

/// Query access to a projection's rows.
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of rows; zero while a writer holds the view.
    fn count(&self) -> usize;
}
