//! Checkout coordinator: cart → order → stock → cart clear.

use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, Utc};
use common::AggregateId;
use domain::order::{CancelOrder, CommitStock, PlaceOrder};
use domain::{
    Address, Aggregate, AccountId, CartService, CatalogError, CatalogStore, CommandHandler,
    CustomerKey, DomainError, DomainEvent, Order, OrderError, OrderLine, OrderNumber,
    OrderService, OrderStatus, PaymentMethod, Product, ProductId, ShippingMethod,
};
use event_store::{AppendOptions, EventEnvelope, EventStore, SequenceAllocator};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::aggregate::{CheckoutLog, log_stream, stock_lines};
use crate::error::{CheckoutError, Result};
use crate::events::CheckoutEvent;
use crate::state::CheckoutState;
use crate::steps::CheckoutStep;

/// Actor name recorded on orders the coordinator cancels itself.
const CHECKOUT_ACTOR: &str = "checkout";

/// Number of order locks; orders hashing to the same stripe serialize.
const ORDER_LOCK_STRIPES: usize = 64;

/// What the customer submits at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer: AccountId,
    pub payment_method: PaymentMethod,
    pub billing_address: Address,
    /// Falls back to the cart's address, then to the billing address.
    pub shipping_address: Option<Address>,
    /// Falls back to the cart's selection, then to standard.
    pub shipping_method: Option<ShippingMethod>,
    pub notes: Option<String>,
}

impl CheckoutRequest {
    pub fn new(customer: AccountId, payment_method: PaymentMethod, billing_address: Address) -> Self {
        Self {
            customer,
            payment_method,
            billing_address,
            shipping_address: None,
            shipping_method: None,
            notes: None,
        }
    }

    pub fn with_shipping_address(mut self, address: Address) -> Self {
        self.shipping_address = Some(address);
        self
    }

    pub fn with_shipping_method(mut self, method: ShippingMethod) -> Self {
        self.shipping_method = Some(method);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// The order a checkout produced and where the checkout ended up.
///
/// `state` is `Stalled` when the order was persisted but a later step
/// has to be retried.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub state: CheckoutState,
}

/// Outcome of [`CheckoutCoordinator::resume_stalled`] and
/// [`CheckoutCoordinator::recover`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResumeReport {
    pub resumed: Vec<AggregateId>,
    pub still_stalled: Vec<AggregateId>,
}

/// Turns carts into orders.
///
/// Each checkout is recorded in its own event-sourced log before any
/// effect happens. Stock commit failures are compensated: decrements are
/// given back and the order is cancelled. Failures after stock was
/// committed leave the order standing and the log `Stalled`, to be
/// finished by [`resume`](Self::resume).
///
/// Checkout, resume and cancellation of the same order never overlap
/// within one process.
pub struct CheckoutCoordinator<S: EventStore> {
    logs: CommandHandler<S, CheckoutLog>,
    orders: OrderService<S>,
    carts: Arc<CartService<S>>,
    catalog: Arc<dyn CatalogStore>,
    sequences: Arc<dyn SequenceAllocator>,
    order_locks: Vec<Mutex<()>>,
}

impl<S> CheckoutCoordinator<S>
where
    S: EventStore + Clone,
{
    pub fn new(
        store: S,
        carts: Arc<CartService<S>>,
        catalog: Arc<dyn CatalogStore>,
        sequences: Arc<dyn SequenceAllocator>,
    ) -> Self {
        Self {
            logs: CommandHandler::new(store.clone()),
            orders: OrderService::new(store),
            carts,
            catalog,
            sequences,
            order_locks: (0..ORDER_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn orders(&self) -> &OrderService<S> {
        &self.orders
    }

    /// Checks out the customer's cart.
    #[tracing::instrument(skip(self, request), fields(customer = %request.customer))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutReceipt> {
        metrics::counter!("checkout_total").increment(1);
        let started = Instant::now();

        let result = self.run_checkout(request).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::counter!("checkout_failed_total", "reason" => e.kind()).increment(1);
        }
        result
    }

    /// Picks up a checkout that stalled or was interrupted.
    ///
    /// Only the steps the log does not show as done are run again.
    #[tracing::instrument(skip(self))]
    pub async fn resume(&self, order_id: &AggregateId) -> Result<CheckoutReceipt> {
        let _guard = self.lock_order(order_id).await;
        let mut log = self
            .checkout_log(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(order_id.clone()))?;

        if !log.state().can_resume() {
            return Err(CheckoutError::NotResumable {
                order_id: order_id.clone(),
                state: log.state(),
            });
        }

        self.record(&mut log, CheckoutEvent::checkout_resumed())
            .await?;
        tracing::info!(
            %order_id,
            compensating = log.is_compensating(),
            remaining = ?log.remaining_steps(),
            "resuming checkout"
        );

        if log.is_compensating() {
            let reason = log.failure_reason().unwrap_or("checkout failed").to_string();
            self.compensate(&mut log, CheckoutStep::RestoreStock, reason)
                .await?;
            self.receipt(&log, order_id).await
        } else {
            self.run_forward(&mut log).await
        }
    }

    /// Resumes every checkout whose log ended `Stalled`.
    #[tracing::instrument(skip(self))]
    pub async fn resume_stalled(&self) -> Result<ResumeReport> {
        self.resume_where("CheckoutStalled", |state| state == CheckoutState::Stalled)
            .await
    }

    /// Finishes or rolls back every checkout left unfinished by a previous
    /// run, stalled or not.
    ///
    /// Logs still `Running` or `Compensating` were cut off mid-step, so this
    /// must only run while no checkout is in flight, i.e. at startup.
    #[tracing::instrument(skip(self))]
    pub async fn recover(&self) -> Result<ResumeReport> {
        self.resume_where("CheckoutStarted", |state| state.can_resume())
            .await
    }

    async fn resume_where(
        &self,
        event_type: &str,
        wanted: impl Fn(CheckoutState) -> bool,
    ) -> Result<ResumeReport> {
        let events = self.logs.store().get_events_by_type(event_type).await?;

        let mut seen = HashSet::new();
        let mut report = ResumeReport::default();
        for envelope in events {
            if !seen.insert(envelope.aggregate_id.clone()) {
                continue;
            }
            let Some(log) = self.logs.load_existing(&envelope.aggregate_id).await? else {
                continue;
            };
            let state = log.state();
            if !wanted(state) {
                continue;
            }
            let Some(order_id) = log.order_id().cloned() else {
                continue;
            };
            if state != CheckoutState::Stalled {
                let step = log.current_step().map_or("unknown", |step| step.as_str());
                metrics::counter!("checkout_integrity_gaps_total", "step" => step).increment(1);
                tracing::warn!(%order_id, %state, step, "checkout was interrupted mid-step");
            }

            match self.resume(&order_id).await {
                Ok(receipt) if receipt.state == CheckoutState::Stalled => {
                    report.still_stalled.push(order_id);
                }
                Ok(_) => report.resumed.push(order_id),
                Err(e) => {
                    tracing::warn!(%order_id, error = %e, "checkout could not be resumed");
                    report.still_stalled.push(order_id);
                }
            }
        }

        tracing::info!(
            resumed = report.resumed.len(),
            still_stalled = report.still_stalled.len(),
            "unfinished checkouts processed"
        );
        Ok(report)
    }

    /// Loads the checkout log of an order.
    pub async fn checkout_log(&self, order_id: &AggregateId) -> Result<Option<CheckoutLog>> {
        Ok(self.logs.load_existing(&log_stream(order_id)).await?)
    }

    /// Cancels an order and gives its decremented stock back.
    ///
    /// Only pending and confirmed orders can be cancelled. Stock is
    /// restored per product from the checkout log, so a restore that
    /// failed earlier is never applied twice. Waits for a checkout of the
    /// same order that is still running.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel_order(
        &self,
        order_id: &AggregateId,
        reason: String,
        cancelled_by: &str,
    ) -> Result<Order> {
        let _guard = self.lock_order(order_id).await;
        let order = self
            .orders
            .cancel(CancelOrder::new(order_id.clone(), reason, cancelled_by))
            .await?
            .aggregate;

        let Some(mut log) = self.checkout_log(order_id).await? else {
            if order.stock_committed() {
                metrics::counter!("checkout_integrity_gaps_total", "step" => CheckoutStep::RestoreStock.as_str())
                    .increment(1);
                tracing::warn!(%order_id, "cancelled order has no checkout log; stock not restored");
            }
            return Ok(order);
        };

        if let Err(error) = self.restore_outstanding(&mut log).await? {
            self.record(
                &mut log,
                CheckoutEvent::compensation_step_failed(CheckoutStep::RestoreStock, error.clone()),
            )
            .await?;
            self.stall(&mut log, CheckoutStep::RestoreStock, error)
                .await?;
        }

        tracing::info!(%order_id, %cancelled_by, "order cancelled");
        Ok(order)
    }

    async fn run_checkout(&self, request: CheckoutRequest) -> Result<CheckoutReceipt> {
        let key = CustomerKey::from(request.customer.clone());
        let cart = match self.carts.find(&key).await? {
            Some(cart)
                if !cart.is_empty() && !cart.is_idle(Utc::now(), self.carts.retention()) =>
            {
                cart
            }
            _ => return Err(CheckoutError::EmptyCart),
        };

        request.billing_address.validate()?;
        let shipping_address = request
            .shipping_address
            .or_else(|| cart.shipping_address().cloned())
            .unwrap_or_else(|| request.billing_address.clone());
        shipping_address.validate()?;
        let shipping_method = request
            .shipping_method
            .or_else(|| cart.shipping().map(|selection| selection.method))
            .unwrap_or_default();

        // Advisory re-check; the decrement below is authoritative.
        let mut products: HashMap<ProductId, Product> = HashMap::new();
        let mut lines = Vec::with_capacity(cart.item_count());
        for item in cart.items() {
            if !products.contains_key(&item.product_id) {
                let product = self
                    .catalog
                    .get_product(&item.product_id)
                    .await?
                    .filter(|product| product.active)
                    .ok_or_else(|| CheckoutError::ProductUnavailable(item.name.clone()))?;
                products.insert(item.product_id.clone(), product);
            }
            let Some(product) = products.get(&item.product_id) else {
                return Err(CheckoutError::ProductUnavailable(item.name.clone()));
            };
            lines.push(OrderLine::new(
                product.id.clone(),
                product.name.clone(),
                product.sku.clone(),
                item.variant.clone(),
                item.quantity,
                item.unit_price,
            ));
        }
        for needed in stock_lines(&lines) {
            let product = products
                .get(&needed.product_id)
                .ok_or_else(|| CheckoutError::ProductUnavailable(needed.product_id.to_string()))?;
            if needed.quantity > product.stock {
                return Err(CheckoutError::InsufficientStock {
                    product: product.name.clone(),
                    requested: needed.quantity,
                    available: product.stock,
                });
            }
        }

        let order_number =
            OrderNumber::allocate(self.sequences.as_ref(), Local::now().date_naive()).await?;
        let order_id = AggregateId::new();
        let _guard = self.lock_order(&order_id).await;
        let place = PlaceOrder {
            order_id: order_id.clone(),
            order_number,
            customer: request.customer,
            lines,
            billing_address: request.billing_address,
            shipping_address,
            shipping_method,
            payment_method: request.payment_method,
            coupon: cart.coupon().cloned(),
            notes: request.notes,
            pricing: *cart.pricing(),
        };
        let item_ids = cart.items().iter().map(|item| item.item_id.clone()).collect();

        let mut log = CheckoutLog::default();
        self.record(
            &mut log,
            CheckoutEvent::checkout_started(log_stream(&order_id), key, item_ids, place),
        )
        .await?;
        tracing::info!(
            %order_id,
            order_number = ?log.order_number().map(|n| n.as_str()),
            "checkout started"
        );

        self.run_forward(&mut log).await
    }

    /// Runs whichever forward steps the log has not completed.
    async fn run_forward(&self, log: &mut CheckoutLog) -> Result<CheckoutReceipt> {
        let place = log
            .order_command()
            .cloned()
            .ok_or(CheckoutError::NotStarted)?;
        let order_id = place.order_id.clone();

        if !log.has_completed(CheckoutStep::PlaceOrder) {
            self.record(log, CheckoutEvent::step_started(CheckoutStep::PlaceOrder))
                .await?;
            match self.orders.place_order(place.clone()).await {
                Ok(_) | Err(DomainError::Order(OrderError::AlreadyPlaced)) => {}
                Err(e) => {
                    let reason = e.to_string();
                    self.record(
                        log,
                        CheckoutEvent::step_failed(CheckoutStep::PlaceOrder, reason.clone()),
                    )
                    .await?;
                    self.record(log, CheckoutEvent::checkout_failed(reason))
                        .await?;
                    return Err(e.into());
                }
            }
            self.record(log, CheckoutEvent::step_completed(CheckoutStep::PlaceOrder))
                .await?;
        }

        let order = self
            .orders
            .get_order(&order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(order_id.clone()))?;
        if order.status() == OrderStatus::Cancelled {
            self.compensate(
                log,
                CheckoutStep::CommitStock,
                "order cancelled before checkout finished".to_string(),
            )
            .await?;
            return self.receipt(log, &order_id).await;
        }

        if !log.has_completed(CheckoutStep::CommitStock) {
            self.record(log, CheckoutEvent::step_started(CheckoutStep::CommitStock))
                .await?;
            for movement in log.pending_decrements() {
                match self
                    .catalog
                    .decrement_stock(&movement.product_id, movement.quantity)
                    .await
                {
                    Ok(remaining) => {
                        tracing::debug!(product_id = %movement.product_id, remaining, "stock decremented");
                        self.record(log, CheckoutEvent::stock_decremented(movement))
                            .await?;
                    }
                    Err(e) => {
                        let error = stock_error(&place.lines, e);
                        self.record(
                            log,
                            CheckoutEvent::step_failed(CheckoutStep::CommitStock, error.to_string()),
                        )
                        .await?;
                        self.compensate(log, CheckoutStep::CommitStock, error.to_string())
                            .await?;
                        return Err(error);
                    }
                }
            }

            match self.orders.commit_stock(CommitStock::new(order_id.clone())).await {
                Ok(_) => {}
                Err(DomainError::Order(OrderError::InvalidStateTransition {
                    from: OrderStatus::Cancelled,
                    ..
                })) => {
                    let reason = "order cancelled while stock was being committed".to_string();
                    self.record(
                        log,
                        CheckoutEvent::step_failed(CheckoutStep::CommitStock, reason.clone()),
                    )
                    .await?;
                    self.compensate(log, CheckoutStep::CommitStock, reason)
                        .await?;
                    return self.receipt(log, &order_id).await;
                }
                Err(e) => {
                    self.record(
                        log,
                        CheckoutEvent::step_failed(CheckoutStep::CommitStock, e.to_string()),
                    )
                    .await?;
                    self.stall(log, CheckoutStep::CommitStock, e.to_string())
                        .await?;
                    return self.receipt(log, &order_id).await;
                }
            }
            self.record(log, CheckoutEvent::step_completed(CheckoutStep::CommitStock))
                .await?;
        }

        if !log.has_completed(CheckoutStep::ClearCart) {
            let key = log.cart_key().cloned().ok_or(CheckoutError::NotStarted)?;
            self.record(log, CheckoutEvent::step_started(CheckoutStep::ClearCart))
                .await?;
            match self
                .carts
                .check_out(&key, &order_id, log.item_ids().to_vec())
                .await
            {
                Ok(_) => {
                    self.record(log, CheckoutEvent::step_completed(CheckoutStep::ClearCart))
                        .await?;
                }
                Err(e) => {
                    self.record(
                        log,
                        CheckoutEvent::step_failed(CheckoutStep::ClearCart, e.to_string()),
                    )
                    .await?;
                    self.stall(log, CheckoutStep::ClearCart, e.to_string())
                        .await?;
                    return self.receipt(log, &order_id).await;
                }
            }
        }

        self.record(log, CheckoutEvent::checkout_completed())
            .await?;
        tracing::info!(%order_id, "checkout completed");
        self.receipt(log, &order_id).await
    }

    /// Gives back decremented stock and cancels the order.
    ///
    /// Ends the log `Failed`, or `Stalled` if any compensation step failed.
    async fn compensate(
        &self,
        log: &mut CheckoutLog,
        from_step: CheckoutStep,
        reason: String,
    ) -> Result<()> {
        if log.state() != CheckoutState::Compensating {
            self.record(
                log,
                CheckoutEvent::compensation_started(from_step, reason.clone()),
            )
            .await?;
        }

        let mut failure = None;
        match self.restore_outstanding(log).await? {
            Ok(()) => {
                if !log.has_compensated(CheckoutStep::RestoreStock) {
                    self.record(
                        log,
                        CheckoutEvent::compensation_step_completed(CheckoutStep::RestoreStock),
                    )
                    .await?;
                }
            }
            Err(error) => {
                self.record(
                    log,
                    CheckoutEvent::compensation_step_failed(CheckoutStep::RestoreStock, error.clone()),
                )
                .await?;
                failure = Some((CheckoutStep::RestoreStock, error));
            }
        }

        if log.has_completed(CheckoutStep::PlaceOrder)
            && !log.has_compensated(CheckoutStep::CancelOrder)
        {
            let order_id = log.order_id().cloned().ok_or(CheckoutError::NotStarted)?;
            let cancel = CancelOrder::new(order_id, format!("Checkout failed: {reason}"), CHECKOUT_ACTOR);
            match self.orders.cancel(cancel).await {
                Ok(_)
                | Err(DomainError::Order(OrderError::InvalidStateTransition {
                    from: OrderStatus::Cancelled,
                    ..
                })) => {
                    self.record(
                        log,
                        CheckoutEvent::compensation_step_completed(CheckoutStep::CancelOrder),
                    )
                    .await?;
                }
                Err(e) => {
                    self.record(
                        log,
                        CheckoutEvent::compensation_step_failed(CheckoutStep::CancelOrder, e.to_string()),
                    )
                    .await?;
                    failure.get_or_insert((CheckoutStep::CancelOrder, e.to_string()));
                }
            }
        }

        match failure {
            Some((step, error)) => self.stall(log, step, error).await,
            None => {
                self.record(log, CheckoutEvent::checkout_failed(reason.clone()))
                    .await?;
                tracing::warn!(order_id = ?log.order_id(), %reason, "checkout rolled back");
                Ok(())
            }
        }
    }

    /// Restores every decrement the log has not restored yet.
    ///
    /// The outer result is a log write failure; the inner one is the first
    /// catalog failure, after which the remaining restores are skipped.
    async fn restore_outstanding(
        &self,
        log: &mut CheckoutLog,
    ) -> Result<std::result::Result<(), String>> {
        for movement in log.outstanding_restores() {
            match self
                .catalog
                .restore_stock(&movement.product_id, movement.quantity)
                .await
            {
                Ok(_) => {
                    self.record(log, CheckoutEvent::stock_restored(movement))
                        .await?;
                }
                Err(e) => return Ok(Err(e.to_string())),
            }
        }
        Ok(Ok(()))
    }

    /// Marks the log stalled and reports the integrity gap.
    async fn stall(&self, log: &mut CheckoutLog, step: CheckoutStep, reason: String) -> Result<()> {
        self.record(log, CheckoutEvent::checkout_stalled(step, reason.clone()))
            .await?;
        metrics::counter!("checkout_integrity_gaps_total", "step" => step.as_str()).increment(1);
        tracing::warn!(
            order_id = ?log.order_id(),
            %step,
            %reason,
            "checkout stalled: order persisted but a later step failed"
        );
        Ok(())
    }

    async fn receipt(&self, log: &CheckoutLog, order_id: &AggregateId) -> Result<CheckoutReceipt> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(order_id.clone()))?;
        Ok(CheckoutReceipt {
            order,
            state: log.state(),
        })
    }

    async fn lock_order(&self, order_id: &AggregateId) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        order_id.hash(&mut hasher);
        let stripe = (hasher.finish() % self.order_locks.len() as u64) as usize;
        self.order_locks[stripe].lock().await
    }

    /// Appends one event to the log, expecting the version the log is at.
    async fn record(&self, log: &mut CheckoutLog, event: CheckoutEvent) -> Result<()> {
        let aggregate_id = match (log.id(), &event) {
            (Some(id), _) => id.clone(),
            (None, CheckoutEvent::CheckoutStarted(data)) => data.checkout_id.clone(),
            (None, _) => return Err(CheckoutError::NotStarted),
        };
        let current = log.version();
        let next = current.next();

        let envelope = EventEnvelope::builder()
            .event_type(event.event_type())
            .aggregate_id(aggregate_id)
            .aggregate_type(CheckoutLog::aggregate_type())
            .version(next)
            .payload(&event)?
            .build()?;

        self.logs
            .store()
            .append(vec![envelope], AppendOptions::expect_version(current))
            .await?;

        log.apply(event);
        log.set_version(next);
        Ok(())
    }
}

/// Names the product the way the order shows it.
fn stock_error(lines: &[OrderLine], error: CatalogError) -> CheckoutError {
    let name_of = |id: &ProductId| {
        lines
            .iter()
            .find(|line| &line.product_id == id)
            .map_or_else(|| id.to_string(), |line| line.name.clone())
    };
    match error {
        CatalogError::InsufficientStock {
            product_id,
            requested,
            available,
        } => CheckoutError::InsufficientStock {
            product: name_of(&product_id),
            requested,
            available,
        },
        CatalogError::ProductNotFound(product_id) => {
            CheckoutError::ProductUnavailable(name_of(&product_id))
        }
        other => CheckoutError::Catalog(other),
    }
}
