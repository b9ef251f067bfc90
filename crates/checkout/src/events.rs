//! Checkout log events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::cart::ItemId;
use domain::order::PlaceOrder;
use domain::{CustomerKey, DomainEvent, ProductId};
use serde::{Deserialize, Serialize};

use crate::steps::CheckoutStep;

/// Facts recorded while a checkout runs.
///
/// Every external effect is preceded by a `StepStarted` and followed by
/// the matching completion or failure, so an interrupted checkout can be
/// picked up from the log alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CheckoutEvent {
    /// Cart validated and snapshotted; carries everything needed to replay.
    CheckoutStarted(Box<CheckoutStartedData>),

    StepStarted(StepData),

    StepCompleted(StepData),

    StepFailed(StepFailedData),

    /// One product's stock was taken from the catalog.
    StockDecremented(StockMovement),

    /// Stock commit failed; earlier effects are being undone.
    CompensationStarted(CompensationData),

    /// One product's stock was handed back to the catalog.
    StockRestored(StockMovement),

    CompensationStepCompleted(StepData),

    CompensationStepFailed(StepFailedData),

    /// A stalled or interrupted checkout was picked up again.
    CheckoutResumed(TimestampData),

    CheckoutCompleted(TimestampData),

    CheckoutFailed(CheckoutFailedData),

    /// A step failed after the order was persisted.
    CheckoutStalled(CheckoutStalledData),
}

impl DomainEvent for CheckoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CheckoutEvent::CheckoutStarted(_) => "CheckoutStarted",
            CheckoutEvent::StepStarted(_) => "StepStarted",
            CheckoutEvent::StepCompleted(_) => "StepCompleted",
            CheckoutEvent::StepFailed(_) => "StepFailed",
            CheckoutEvent::StockDecremented(_) => "StockDecremented",
            CheckoutEvent::CompensationStarted(_) => "CompensationStarted",
            CheckoutEvent::StockRestored(_) => "StockRestored",
            CheckoutEvent::CompensationStepCompleted(_) => "CompensationStepCompleted",
            CheckoutEvent::CompensationStepFailed(_) => "CompensationStepFailed",
            CheckoutEvent::CheckoutResumed(_) => "CheckoutResumed",
            CheckoutEvent::CheckoutCompleted(_) => "CheckoutCompleted",
            CheckoutEvent::CheckoutFailed(_) => "CheckoutFailed",
            CheckoutEvent::CheckoutStalled(_) => "CheckoutStalled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutStartedData {
    /// Stream id of the log, `checkout-<order id>`.
    pub checkout_id: AggregateId,
    pub cart_key: CustomerKey,
    /// Cart lines that became order lines; these are removed at the end.
    pub item_ids: Vec<ItemId>,
    pub order: PlaceOrder,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepData {
    pub step: CheckoutStep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailedData {
    pub step: CheckoutStep,
    pub error: String,
}

/// A quantity of one product moving out of or back into the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl StockMovement {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationData {
    pub from_step: CheckoutStep,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampData {
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutFailedData {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutStalledData {
    pub step: CheckoutStep,
    pub reason: String,
    pub stalled_at: DateTime<Utc>,
}

impl CheckoutEvent {
    pub fn checkout_started(
        checkout_id: AggregateId,
        cart_key: CustomerKey,
        item_ids: Vec<ItemId>,
        order: PlaceOrder,
    ) -> Self {
        CheckoutEvent::CheckoutStarted(Box::new(CheckoutStartedData {
            checkout_id,
            cart_key,
            item_ids,
            order,
            started_at: Utc::now(),
        }))
    }

    pub fn step_started(step: CheckoutStep) -> Self {
        CheckoutEvent::StepStarted(StepData { step })
    }

    pub fn step_completed(step: CheckoutStep) -> Self {
        CheckoutEvent::StepCompleted(StepData { step })
    }

    pub fn step_failed(step: CheckoutStep, error: impl Into<String>) -> Self {
        CheckoutEvent::StepFailed(StepFailedData {
            step,
            error: error.into(),
        })
    }

    pub fn stock_decremented(movement: StockMovement) -> Self {
        CheckoutEvent::StockDecremented(movement)
    }

    pub fn compensation_started(from_step: CheckoutStep, reason: impl Into<String>) -> Self {
        CheckoutEvent::CompensationStarted(CompensationData {
            from_step,
            reason: reason.into(),
        })
    }

    pub fn stock_restored(movement: StockMovement) -> Self {
        CheckoutEvent::StockRestored(movement)
    }

    pub fn compensation_step_completed(step: CheckoutStep) -> Self {
        CheckoutEvent::CompensationStepCompleted(StepData { step })
    }

    pub fn compensation_step_failed(step: CheckoutStep, error: impl Into<String>) -> Self {
        CheckoutEvent::CompensationStepFailed(StepFailedData {
            step,
            error: error.into(),
        })
    }

    pub fn checkout_resumed() -> Self {
        CheckoutEvent::CheckoutResumed(TimestampData { at: Utc::now() })
    }

    pub fn checkout_completed() -> Self {
        CheckoutEvent::CheckoutCompleted(TimestampData { at: Utc::now() })
    }

    pub fn checkout_failed(reason: impl Into<String>) -> Self {
        CheckoutEvent::CheckoutFailed(CheckoutFailedData {
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }

    pub fn checkout_stalled(step: CheckoutStep, reason: impl Into<String>) -> Self {
        CheckoutEvent::CheckoutStalled(CheckoutStalledData {
            step,
            reason: reason.into(),
            stalled_at: Utc::now(),
        })
    }
}
