//! Append-only event persistence for carts, orders and checkout logs.
//!
//! Every aggregate in the marketplace is stored as a stream of JSON events
//! keyed by [`AggregateId`]. Appends carry an expected version so concurrent
//! read-modify-write cycles on the same stream are detected instead of
//! silently overwriting each other.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod sequence;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::{PostgresEventStore, PostgresSequenceAllocator};
pub use sequence::{InMemorySequenceAllocator, SequenceAllocator};
pub use snapshot::Snapshot;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
