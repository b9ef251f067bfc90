//! Read models and projections for the query side.
//!
//! - [`Projection`] and [`ReadModel`], the write and query faces of a view
//! - [`ProjectionProcessor`] for feeding events from the store to projections
//! - [`OrderSummaryView`], the read model behind order listings

pub mod error;
pub mod processor;
pub mod projection;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Checkpoint, Projection, ReadModel};
pub use views::{OrderSummary, OrderSummaryView};
