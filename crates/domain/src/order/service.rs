//! Order service providing a simplified API for order operations.

use common::AggregateId;
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{CancelOrder, CommitStock, IssueRefund, Order, PlaceOrder, TransitionOrder};

/// Service for managing orders.
///
/// Wraps the command handler; every write is conditional on the version the
/// order was loaded at, so concurrent administrators cannot both win.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore + Clone> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<S: EventStore> OrderService<S> {
    /// Creates a new order service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    /// Loads an order, or None if it was never placed.
    pub async fn get_order(&self, order_id: &AggregateId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }

    /// Places a new order.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, order_number = %cmd.order_number))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<CommandResult<Order>, DomainError> {
        let order_id = cmd.order_id.clone();
        let result = self
            .handler
            .execute_with_snapshot(&order_id, None, move |order| order.place(cmd))
            .await?;

        metrics::counter!("orders_placed_total").increment(1);
        Ok(result)
    }

    /// Marks the order's stock as deducted.
    #[tracing::instrument(skip(self))]
    pub async fn commit_stock(&self, cmd: CommitStock) -> Result<CommandResult<Order>, DomainError> {
        self.handler
            .execute_with_snapshot(&cmd.order_id, None, |order| order.commit_stock())
            .await
    }

    /// Moves the order to another status.
    #[tracing::instrument(skip(self))]
    pub async fn transition(
        &self,
        cmd: TransitionOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        let to = cmd.status;
        let order_id = cmd.order_id.clone();
        let result = self
            .handler
            .execute_with_snapshot(&order_id, None, move |order| {
                order.transition(
                    cmd.status,
                    cmd.message,
                    cmd.tracking_number,
                    &cmd.changed_by,
                )
            })
            .await?;

        metrics::counter!("order_transitions_total", "to" => to.as_str()).increment(1);
        Ok(result)
    }

    /// Cancels a pending or confirmed order.
    ///
    /// Stock is not touched here; the checkout coordinator restores it for
    /// orders whose stock was committed.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, cmd: CancelOrder) -> Result<CommandResult<Order>, DomainError> {
        let order_id = cmd.order_id.clone();
        let result = self
            .handler
            .execute_with_snapshot(&order_id, None, move |order| {
                order.cancel(cmd.reason, &cmd.cancelled_by)
            })
            .await?;

        metrics::counter!("order_transitions_total", "to" => "cancelled").increment(1);
        Ok(result)
    }

    /// Refunds part or all of an order.
    #[tracing::instrument(skip(self))]
    pub async fn refund(&self, cmd: IssueRefund) -> Result<CommandResult<Order>, DomainError> {
        let amount = cmd.amount;
        let order_id = cmd.order_id.clone();
        let result = self
            .handler
            .execute_with_snapshot(&order_id, None, move |order| {
                order.refund(cmd.amount, cmd.reason, cmd.method)
            })
            .await?;

        tracing::info!(order_id = %order_id, amount = %amount, "refund issued");
        metrics::counter!("refunds_total").increment(1);
        Ok(result)
    }
}
