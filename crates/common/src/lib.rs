//! Shared types used across the marketplace crates.

pub mod types;

pub use types::AggregateId;
