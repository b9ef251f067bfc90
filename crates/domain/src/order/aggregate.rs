//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::accounts::AccountId;
use crate::address::Address;
use crate::aggregate::{Aggregate, SnapshotCapable};
use crate::money::Money;
use crate::pricing::{ShippingMethod, Totals, compute_totals};

use super::{
    OrderError, OrderEvent, OrderLine, OrderNumber, OrderPlacedData, OrderStatus, PaymentMethod,
    PaymentStatus, PlaceOrder, Refund, RefundMethod, TimelineEntry,
};

/// Order aggregate root.
///
/// The line snapshot and price breakdown are fixed when the order is placed;
/// everything after that only moves status, payment state and refunds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    order_number: Option<OrderNumber>,

    customer: Option<AccountId>,

    lines: Vec<OrderLine>,

    billing_address: Option<Address>,

    shipping_address: Option<Address>,

    shipping_method: Option<ShippingMethod>,

    payment_method: Option<PaymentMethod>,

    coupon_code: Option<String>,

    notes: Option<String>,

    totals: Totals,

    status: OrderStatus,

    payment_status: PaymentStatus,

    timeline: Vec<TimelineEntry>,

    refunds: Vec<Refund>,

    stock_committed: bool,

    tracking_number: Option<String>,

    cancellation_reason: Option<String>,

    placed_at: Option<DateTime<Utc>>,

    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<&AggregateId> {
        self.id.as_ref()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => {
                let data = *data;
                self.id = Some(data.order_id);
                self.order_number = Some(data.order_number);
                self.customer = Some(data.customer);
                self.lines = data.lines;
                self.billing_address = Some(data.billing_address);
                self.shipping_address = Some(data.shipping_address);
                self.shipping_method = Some(data.shipping_method);
                self.payment_method = Some(data.payment_method);
                self.coupon_code = data.coupon_code;
                self.notes = data.notes;
                self.totals = data.totals;
                self.status = OrderStatus::Pending;
                self.payment_status = PaymentStatus::Pending;
                self.placed_at = Some(data.placed_at);
                self.updated_at = Some(data.placed_at);
                self.timeline.push(TimelineEntry {
                    status: OrderStatus::Pending,
                    message: "Order placed".to_string(),
                    timestamp: data.placed_at,
                });
            }
            OrderEvent::StockCommitted(data) => {
                self.stock_committed = true;
                self.updated_at = Some(data.committed_at);
            }
            OrderEvent::StatusChanged(data) => {
                self.status = data.to;
                if data.tracking_number.is_some() {
                    self.tracking_number = data.tracking_number;
                }
                if self.payment_status == PaymentStatus::Pending
                    && self.payment_method.is_some_and(|m| m.is_paid_at(data.to))
                {
                    self.payment_status = PaymentStatus::Paid;
                }
                self.updated_at = Some(data.changed_at);
                self.timeline.push(TimelineEntry {
                    status: data.to,
                    message: data.message,
                    timestamp: data.changed_at,
                });
            }
            OrderEvent::OrderCancelled(data) => {
                self.status = OrderStatus::Cancelled;
                self.updated_at = Some(data.cancelled_at);
                self.timeline.push(TimelineEntry {
                    status: OrderStatus::Cancelled,
                    message: format!("Cancelled by {}: {}", data.cancelled_by, data.reason),
                    timestamp: data.cancelled_at,
                });
                self.cancellation_reason = Some(data.reason);
            }
            OrderEvent::RefundIssued(data) => {
                let refund = data.refund;
                if data.completes_refund {
                    self.status = OrderStatus::Refunded;
                    self.payment_status = PaymentStatus::Refunded;
                } else {
                    self.payment_status = PaymentStatus::PartiallyRefunded;
                }
                self.updated_at = Some(refund.refunded_at);
                self.timeline.push(TimelineEntry {
                    status: self.status,
                    message: format!("Refunded {}: {}", refund.amount, refund.reason),
                    timestamp: refund.refunded_at,
                });
                self.refunds.push(refund);
            }
        }
    }
}

impl SnapshotCapable for Order {}

// Query methods
impl Order {
    pub fn order_number(&self) -> Option<&OrderNumber> {
        self.order_number.as_ref()
    }

    pub fn customer(&self) -> Option<&AccountId> {
        self.customer.as_ref()
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn billing_address(&self) -> Option<&Address> {
        self.billing_address.as_ref()
    }

    pub fn shipping_address(&self) -> Option<&Address> {
        self.shipping_address.as_ref()
    }

    pub fn shipping_method(&self) -> Option<ShippingMethod> {
        self.shipping_method
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    pub fn refunds(&self) -> &[Refund] {
        &self.refunds
    }

    /// Sum of every refund issued so far.
    pub fn total_refunded(&self) -> Money {
        self.refunds.iter().map(|r| r.amount).sum()
    }

    /// Amount that can still be refunded.
    pub fn refundable(&self) -> Money {
        self.totals.total - self.total_refunded()
    }

    pub fn stock_committed(&self) -> bool {
        self.stock_committed
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns true if `account` placed this order.
    pub fn is_owned_by(&self, account: &AccountId) -> bool {
        self.customer.as_ref() == Some(account)
    }

    fn ensure_placed(&self) -> Result<(), OrderError> {
        if self.id.is_none() {
            return Err(OrderError::NotFound);
        }
        Ok(())
    }
}

// Command methods (return events)
impl Order {
    /// Places the order, pricing the line snapshot.
    pub fn place(&self, cmd: PlaceOrder) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }
        if cmd.lines.is_empty() {
            return Err(OrderError::NoItems);
        }

        let shipping_cost = cmd.pricing.shipping_cost(cmd.shipping_method);
        let totals = compute_totals(&cmd.lines, cmd.coupon.as_ref(), shipping_cost, &cmd.pricing);

        Ok(vec![OrderEvent::OrderPlaced(Box::new(OrderPlacedData {
            order_id: cmd.order_id,
            order_number: cmd.order_number,
            customer: cmd.customer,
            lines: cmd.lines,
            billing_address: cmd.billing_address,
            shipping_address: cmd.shipping_address,
            shipping_method: cmd.shipping_method,
            payment_method: cmd.payment_method,
            coupon_code: cmd.coupon.map(|c| c.code),
            totals,
            notes: cmd.notes,
            placed_at: Utc::now(),
        }))])
    }

    /// Records that stock has been deducted. Repeating it is a no-op.
    ///
    /// An order cancelled before its stock was committed cannot take it.
    pub fn commit_stock(&self) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;
        if self.stock_committed {
            return Ok(vec![]);
        }
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::InvalidStateTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Cancelled,
            });
        }
        Ok(vec![OrderEvent::stock_committed()])
    }

    /// Moves the order along the fulfilment chain.
    ///
    /// A `Cancelled` target is handled as a cancellation.
    pub fn transition(
        &self,
        to: OrderStatus,
        message: Option<String>,
        tracking_number: Option<String>,
        changed_by: &str,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;

        if to == OrderStatus::Cancelled {
            let reason = message.unwrap_or_else(|| "Cancelled by administrator".to_string());
            return self.cancel(reason, changed_by);
        }

        if !self.status.can_advance_to(to) {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to,
            });
        }

        let message = message.unwrap_or_else(|| format!("Order {to}"));
        let tracking_number = tracking_number.filter(|_| to == OrderStatus::Shipped);

        Ok(vec![OrderEvent::status_changed(
            self.status,
            to,
            message,
            tracking_number,
            changed_by.to_string(),
        )])
    }

    /// Cancels a pending or confirmed order.
    pub fn cancel(&self, reason: String, cancelled_by: &str) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;

        if !self.status.can_cancel() {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }

        Ok(vec![OrderEvent::order_cancelled(
            reason,
            cancelled_by.to_string(),
        )])
    }

    /// Refunds part or all of the remaining order total.
    pub fn refund(
        &self,
        amount: Money,
        reason: String,
        method: RefundMethod,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;

        if !amount.is_positive() {
            return Err(OrderError::InvalidRefundAmount(amount));
        }
        if self.status == OrderStatus::Refunded {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Refunded,
            });
        }

        let remaining = self.refundable();
        if amount > remaining {
            return Err(OrderError::RefundExceedsTotal {
                requested: amount,
                remaining,
            });
        }

        let refund = Refund {
            amount,
            reason,
            method,
            refunded_at: Utc::now(),
        };
        Ok(vec![OrderEvent::refund_issued(refund, amount == remaining)])
    }
}
