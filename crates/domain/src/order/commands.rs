//! Order commands.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::accounts::AccountId;
use crate::address::Address;
use crate::command::Command;
use crate::money::Money;
use crate::pricing::{Coupon, PricingConfig, ShippingMethod};

use super::{Order, OrderLine, OrderNumber, OrderStatus, PaymentMethod, RefundMethod};

/// Command to place an order from a priced cart snapshot.
///
/// Serializable so a checkout log can replay it after an interruption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: AggregateId,
    pub order_number: OrderNumber,
    pub customer: AccountId,
    pub lines: Vec<OrderLine>,
    pub billing_address: Address,
    pub shipping_address: Address,
    pub shipping_method: ShippingMethod,
    pub payment_method: PaymentMethod,
    pub coupon: Option<Coupon>,
    pub notes: Option<String>,
    pub pricing: PricingConfig,
}

impl Command for PlaceOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id.clone()
    }
}

/// Command to record that stock has been deducted for an order.
#[derive(Debug, Clone)]
pub struct CommitStock {
    pub order_id: AggregateId,
}

impl CommitStock {
    pub fn new(order_id: AggregateId) -> Self {
        Self { order_id }
    }
}

impl Command for CommitStock {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id.clone()
    }
}

/// Command to move an order to another status.
#[derive(Debug, Clone)]
pub struct TransitionOrder {
    pub order_id: AggregateId,
    pub status: OrderStatus,
    pub message: Option<String>,
    pub tracking_number: Option<String>,
    pub changed_by: String,
}

impl TransitionOrder {
    pub fn new(order_id: AggregateId, status: OrderStatus, changed_by: impl Into<String>) -> Self {
        Self {
            order_id,
            status,
            message: None,
            tracking_number: None,
            changed_by: changed_by.into(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_tracking_number(mut self, tracking_number: impl Into<String>) -> Self {
        self.tracking_number = Some(tracking_number.into());
        self
    }
}

impl Command for TransitionOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id.clone()
    }
}

/// Command to cancel an order.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: AggregateId,
    pub reason: String,
    pub cancelled_by: String,
}

impl CancelOrder {
    pub fn new(
        order_id: AggregateId,
        reason: impl Into<String>,
        cancelled_by: impl Into<String>,
    ) -> Self {
        Self {
            order_id,
            reason: reason.into(),
            cancelled_by: cancelled_by.into(),
        }
    }
}

impl Command for CancelOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id.clone()
    }
}

/// Command to refund part or all of an order.
#[derive(Debug, Clone)]
pub struct IssueRefund {
    pub order_id: AggregateId,
    pub amount: Money,
    pub reason: String,
    pub method: RefundMethod,
}

impl IssueRefund {
    pub fn new(order_id: AggregateId, amount: Money, reason: impl Into<String>) -> Self {
        Self {
            order_id,
            amount,
            reason: reason.into(),
            method: RefundMethod::default(),
        }
    }

    pub fn via(mut self, method: RefundMethod) -> Self {
        self.method = method;
        self
    }
}

impl Command for IssueRefund {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id.clone()
    }
}
