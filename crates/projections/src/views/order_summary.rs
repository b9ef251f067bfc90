//! Order summary read model: one row per order for listings.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{
    AccountId, Money, OrderEvent, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus,
};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{ProjectionError, Result};
use crate::projection::{Checkpoint, Projection, ReadModel};

/// Listing row for a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub order_id: AggregateId,
    pub order_number: OrderNumber,
    pub customer: AccountId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub item_count: usize,
    pub total_quantity: u32,
    pub total: Money,
    pub total_refunded: Money,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

struct OrderSummaryState {
    orders: HashMap<AggregateId, OrderSummary>,
    checkpoint: Checkpoint,
}

/// Read model backing the customer and administrator order listings.
#[derive(Clone)]
pub struct OrderSummaryView {
    state: Arc<RwLock<OrderSummaryState>>,
}

impl OrderSummaryView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(OrderSummaryState {
                orders: HashMap::new(),
                checkpoint: Checkpoint::start(),
            })),
        }
    }

    pub async fn get(&self, order_id: &AggregateId) -> Option<OrderSummary> {
        self.state.read().await.orders.get(order_id).cloned()
    }

    /// Orders placed by one customer, newest first.
    pub async fn for_customer(&self, customer: &AccountId) -> Vec<OrderSummary> {
        let state = self.state.read().await;
        newest_first(
            state
                .orders
                .values()
                .filter(|o| &o.customer == customer)
                .cloned()
                .collect(),
        )
    }

    /// Every order, newest first, optionally narrowed to one status.
    pub async fn all(&self, status: Option<OrderStatus>) -> Vec<OrderSummary> {
        let state = self.state.read().await;
        newest_first(
            state
                .orders
                .values()
                .filter(|o| status.is_none_or(|s| o.status == s))
                .cloned()
                .collect(),
        )
    }
}

fn newest_first(mut orders: Vec<OrderSummary>) -> Vec<OrderSummary> {
    orders.sort_by(|a, b| {
        b.placed_at
            .cmp(&a.placed_at)
            .then_with(|| b.order_number.cmp(&a.order_number))
    });
    orders
}

impl Default for OrderSummaryView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for OrderSummaryView {
    fn name(&self) -> &'static str {
        "OrderSummaryView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let mut state = self.state.write().await;
        state.checkpoint = state.checkpoint.next();

        if event.aggregate_type != "Order" {
            return Ok(());
        }

        let order_event: OrderEvent = serde_json::from_value(event.payload.clone())
            .map_err(|e| ProjectionError::undecodable(event, e))?;
        let order_id = &event.aggregate_id;

        if let OrderEvent::OrderPlaced(data) = order_event {
            let summary = OrderSummary {
                order_id: data.order_id.clone(),
                order_number: data.order_number.clone(),
                customer: data.customer.clone(),
                status: OrderStatus::Pending,
                payment_method: data.payment_method,
                payment_status: PaymentStatus::Pending,
                item_count: data.lines.len(),
                total_quantity: data.lines.iter().map(|l| l.quantity).sum(),
                total: data.totals.total,
                total_refunded: Money::zero(),
                placed_at: data.placed_at,
                updated_at: data.placed_at,
            };
            state.orders.insert(order_id.clone(), summary);
            return Ok(());
        }

        let Some(summary) = state.orders.get_mut(order_id) else {
            tracing::warn!(order_id = %order_id, "event for an order the view has not seen");
            return Ok(());
        };

        match order_event {
            OrderEvent::OrderPlaced(_) => {}
            OrderEvent::StockCommitted(data) => summary.updated_at = data.committed_at,
            OrderEvent::StatusChanged(data) => {
                summary.status = data.to;
                summary.updated_at = data.changed_at;
                if summary.payment_status == PaymentStatus::Pending
                    && summary.payment_method.is_paid_at(data.to)
                {
                    summary.payment_status = PaymentStatus::Paid;
                }
            }
            OrderEvent::OrderCancelled(data) => {
                summary.status = OrderStatus::Cancelled;
                summary.updated_at = data.cancelled_at;
            }
            OrderEvent::RefundIssued(data) => {
                summary.total_refunded += data.refund.amount;
                summary.updated_at = data.refund.refunded_at;
                if data.completes_refund {
                    summary.status = OrderStatus::Refunded;
                    summary.payment_status = PaymentStatus::Refunded;
                } else {
                    summary.payment_status = PaymentStatus::PartiallyRefunded;
                }
            }
        }

        Ok(())
    }

    async fn checkpoint(&self) -> Checkpoint {
        self.state.read().await.checkpoint
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.orders.clear();
        state.checkpoint = Checkpoint::start();
        Ok(())
    }
}

impl ReadModel for OrderSummaryView {
    fn name(&self) -> &'static str {
        "OrderSummaryView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.orders.len()).unwrap_or(0)
    }
}
