//! The checkout log aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::cart::ItemId;
use domain::order::PlaceOrder;
use domain::{Aggregate, CustomerKey, OrderLine, OrderNumber, ProductId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;
use crate::events::{CheckoutEvent, StockMovement};
use crate::state::CheckoutState;
use crate::steps::CheckoutStep;

/// Stream prefix for checkout logs; the log of order `X` is `checkout-X`.
pub const STREAM_PREFIX: &str = "checkout";

/// Stream id of the checkout log for an order.
pub fn log_stream(order_id: &AggregateId) -> AggregateId {
    order_id.scoped(STREAM_PREFIX)
}

/// Event-sourced record of one checkout.
///
/// Holds the order snapshot taken at the start plus which steps and stock
/// movements have happened, which is all a resume needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutLog {
    id: Option<AggregateId>,
    version: Version,
    state: CheckoutState,
    cart_key: Option<CustomerKey>,
    item_ids: Vec<ItemId>,
    order: Option<PlaceOrder>,
    current_step: Option<CheckoutStep>,
    completed_steps: Vec<CheckoutStep>,
    compensated_steps: Vec<CheckoutStep>,
    decremented: Vec<StockMovement>,
    restored: Vec<StockMovement>,
    compensating: bool,
    stalled_step: Option<CheckoutStep>,
    failure_reason: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Aggregate for CheckoutLog {
    type Event = CheckoutEvent;
    type Error = CheckoutError;

    fn aggregate_type() -> &'static str {
        "Checkout"
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
            CheckoutEvent::CheckoutStarted(data) => {
                let data = *data;
                self.id = Some(data.checkout_id);
                self.cart_key = Some(data.cart_key);
                self.item_ids = data.item_ids;
                self.order = Some(data.order);
                self.started_at = Some(data.started_at);
                self.state = CheckoutState::Running;
            }
            CheckoutEvent::StepStarted(data) => {
                self.current_step = Some(data.step);
            }
            CheckoutEvent::StepCompleted(data) => {
                if !self.completed_steps.contains(&data.step) {
                    self.completed_steps.push(data.step);
                }
                self.current_step = None;
            }
            CheckoutEvent::StepFailed(data) => {
                self.failure_reason = Some(data.error);
            }
            CheckoutEvent::StockDecremented(movement) => {
                add_movement(&mut self.decremented, movement);
            }
            CheckoutEvent::CompensationStarted(data) => {
                self.compensating = true;
                self.state = CheckoutState::Compensating;
                self.failure_reason = Some(data.reason);
            }
            CheckoutEvent::StockRestored(movement) => {
                add_movement(&mut self.restored, movement);
            }
            CheckoutEvent::CompensationStepCompleted(data) => {
                if !self.compensated_steps.contains(&data.step) {
                    self.compensated_steps.push(data.step);
                }
            }
            CheckoutEvent::CompensationStepFailed(_) => {}
            CheckoutEvent::CheckoutResumed(_) => {
                self.stalled_step = None;
                self.state = if self.compensating {
                    CheckoutState::Compensating
                } else {
                    CheckoutState::Running
                };
            }
            CheckoutEvent::CheckoutCompleted(data) => {
                self.state = CheckoutState::Completed;
                self.current_step = None;
                self.finished_at = Some(data.at);
            }
            CheckoutEvent::CheckoutFailed(data) => {
                self.state = CheckoutState::Failed;
                self.failure_reason = Some(data.reason);
                self.finished_at = Some(data.failed_at);
            }
            CheckoutEvent::CheckoutStalled(data) => {
                if data.step.is_compensation() {
                    self.compensating = true;
                }
                self.state = CheckoutState::Stalled;
                self.stalled_step = Some(data.step);
                self.failure_reason = Some(data.reason);
            }
        }
    }
}

impl CheckoutLog {
    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn order_id(&self) -> Option<&AggregateId> {
        self.order.as_ref().map(|order| &order.order_id)
    }

    pub fn order_number(&self) -> Option<&OrderNumber> {
        self.order.as_ref().map(|order| &order.order_number)
    }

    /// The order as it was snapshotted from the cart.
    pub fn order_command(&self) -> Option<&PlaceOrder> {
        self.order.as_ref()
    }

    pub fn cart_key(&self) -> Option<&CustomerKey> {
        self.cart_key.as_ref()
    }

    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    pub fn current_step(&self) -> Option<CheckoutStep> {
        self.current_step
    }

    pub fn completed_steps(&self) -> &[CheckoutStep] {
        &self.completed_steps
    }

    pub fn has_completed(&self, step: CheckoutStep) -> bool {
        self.completed_steps.contains(&step)
    }

    pub fn has_compensated(&self, step: CheckoutStep) -> bool {
        self.compensated_steps.contains(&step)
    }

    /// Forward steps that have not completed yet, in execution order.
    pub fn remaining_steps(&self) -> Vec<CheckoutStep> {
        CheckoutStep::FORWARD
            .into_iter()
            .filter(|step| !self.has_completed(*step))
            .collect()
    }

    pub fn decremented(&self) -> &[StockMovement] {
        &self.decremented
    }

    pub fn restored(&self) -> &[StockMovement] {
        &self.restored
    }

    pub fn is_compensating(&self) -> bool {
        self.compensating
    }

    pub fn stalled_step(&self) -> Option<CheckoutStep> {
        self.stalled_step
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Stock the order needs, one entry per product.
    pub fn stock_required(&self) -> Vec<StockMovement> {
        self.order
            .as_ref()
            .map(|order| stock_lines(&order.lines))
            .unwrap_or_default()
    }

    /// Required stock that has not been decremented yet.
    pub fn pending_decrements(&self) -> Vec<StockMovement> {
        subtract(&self.stock_required(), &self.decremented)
    }

    /// Decremented stock that has not been given back yet.
    pub fn outstanding_restores(&self) -> Vec<StockMovement> {
        subtract(&self.decremented, &self.restored)
    }
}

/// Sums order lines per product, keeping first-seen order.
pub fn stock_lines(lines: &[OrderLine]) -> Vec<StockMovement> {
    let mut movements = Vec::new();
    for line in lines {
        add_movement(
            &mut movements,
            StockMovement::new(line.product_id.clone(), line.quantity),
        );
    }
    movements
}

fn add_movement(movements: &mut Vec<StockMovement>, movement: StockMovement) {
    match movements
        .iter_mut()
        .find(|m| m.product_id == movement.product_id)
    {
        Some(existing) => existing.quantity = existing.quantity.saturating_add(movement.quantity),
        None => movements.push(movement),
    }
}

fn quantity_of(movements: &[StockMovement], product_id: &ProductId) -> u32 {
    movements
        .iter()
        .filter(|m| &m.product_id == product_id)
        .map(|m| m.quantity)
        .sum()
}

fn subtract(from: &[StockMovement], done: &[StockMovement]) -> Vec<StockMovement> {
    from.iter()
        .filter_map(|m| {
            let left = m.quantity.saturating_sub(quantity_of(done, &m.product_id));
            (left > 0).then(|| StockMovement::new(m.product_id.clone(), left))
        })
        .collect()
}
