//! Read model views built from the event stream.

mod order_summary;

pub use order_summary::{OrderSummary, OrderSummaryView};
