//! Order domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::accounts::AccountId;
use crate::address::Address;
use crate::aggregate::DomainEvent;
use crate::pricing::{ShippingMethod, Totals};

use super::{OrderLine, OrderNumber, OrderStatus, PaymentMethod, Refund};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed from a cart snapshot.
    OrderPlaced(Box<OrderPlacedData>),

    /// Stock for every line was deducted from the catalog.
    StockCommitted(StockCommittedData),

    /// An administrator moved the order along the fulfilment chain.
    StatusChanged(StatusChangedData),

    /// Order was cancelled.
    OrderCancelled(OrderCancelledData),

    /// Money was returned to the customer.
    RefundIssued(RefundIssuedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::StockCommitted(_) => "StockCommitted",
            OrderEvent::StatusChanged(_) => "StatusChanged",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
            OrderEvent::RefundIssued(_) => "RefundIssued",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub order_number: OrderNumber,
    pub customer: AccountId,
    pub lines: Vec<OrderLine>,
    pub billing_address: Address,
    pub shipping_address: Address,
    pub shipping_method: ShippingMethod,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub totals: Totals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub placed_at: DateTime<Utc>,
}

/// Data for StockCommitted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCommittedData {
    pub committed_at: DateTime<Utc>,
}

/// Data for StatusChanged event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// Data for OrderCancelled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub reason: String,
    pub cancelled_by: String,
    pub cancelled_at: DateTime<Utc>,
}

/// Data for RefundIssued event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundIssuedData {
    pub refund: Refund,
    /// True when this refund brings the refunded total up to the order total.
    pub completes_refund: bool,
}

// Convenience constructors for events
impl OrderEvent {
    pub fn stock_committed() -> Self {
        OrderEvent::StockCommitted(StockCommittedData {
            committed_at: Utc::now(),
        })
    }

    pub fn status_changed(
        from: OrderStatus,
        to: OrderStatus,
        message: String,
        tracking_number: Option<String>,
        changed_by: String,
    ) -> Self {
        OrderEvent::StatusChanged(StatusChangedData {
            from,
            to,
            message,
            tracking_number,
            changed_by,
            changed_at: Utc::now(),
        })
    }

    pub fn order_cancelled(reason: String, cancelled_by: String) -> Self {
        OrderEvent::OrderCancelled(OrderCancelledData {
            reason,
            cancelled_by,
            cancelled_at: Utc::now(),
        })
    }

    pub fn refund_issued(refund: Refund, completes_refund: bool) -> Self {
        OrderEvent::RefundIssued(RefundIssuedData {
            refund,
            completes_refund,
        })
    }
}
