//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use commands::*;
pub use events::{
    OrderCancelledData, OrderEvent, OrderPlacedData, RefundIssuedData, StatusChangedData,
    StockCommittedData,
};
pub use service::OrderService;
pub use status::{OrderStatus, PaymentStatus};
pub use value_objects::{
    OrderLine, OrderNumber, PaymentMethod, Refund, RefundMethod, TimelineEntry,
};

use thiserror::Error;

use crate::money::Money;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found")]
    NotFound,

    #[error("Order already placed")]
    AlreadyPlaced,

    #[error("Order has no items")]
    NoItems,

    /// The requested status change is not allowed from the current status.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: OrderStatus, to: OrderStatus },

    #[error("Invalid refund amount: {0} (must be positive)")]
    InvalidRefundAmount(Money),

    #[error("Refund of {requested} exceeds the remaining refundable amount {remaining}")]
    RefundExceedsTotal { requested: Money, remaining: Money },
}
