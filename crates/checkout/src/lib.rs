//! Checkout orchestration.
//!
//! A checkout turns a customer's cart into an order in three steps:
//! 1. Place the order from a priced snapshot of the cart
//! 2. Commit stock for every product in the catalog
//! 3. Remove the ordered lines from the cart
//!
//! Every step is recorded in an event-sourced checkout log first. A stock
//! failure is compensated (stock given back, order cancelled); a failure
//! after stock was committed leaves the order in place and the log stalled
//! until it is resumed.

pub mod aggregate;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod state;
pub mod steps;

pub use aggregate::{CheckoutLog, log_stream};
pub use coordinator::{CheckoutCoordinator, CheckoutReceipt, CheckoutRequest, ResumeReport};
pub use error::CheckoutError;
pub use events::{CheckoutEvent, StockMovement};
pub use state::CheckoutState;
pub use steps::CheckoutStep;
