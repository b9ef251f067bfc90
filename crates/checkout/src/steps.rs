//! Named steps of a checkout.

use serde::{Deserialize, Serialize};

/// A unit of work the coordinator records in the checkout log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    PlaceOrder,
    CommitStock,
    ClearCart,
    /// Compensation: give back stock that was decremented.
    RestoreStock,
    /// Compensation: cancel the placed order.
    CancelOrder,
}

impl CheckoutStep {
    /// Forward steps in execution order.
    pub const FORWARD: [CheckoutStep; 3] = [
        CheckoutStep::PlaceOrder,
        CheckoutStep::CommitStock,
        CheckoutStep::ClearCart,
    ];

    pub fn is_compensation(&self) -> bool {
        matches!(self, CheckoutStep::RestoreStock | CheckoutStep::CancelOrder)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::PlaceOrder => "place_order",
            CheckoutStep::CommitStock => "commit_stock",
            CheckoutStep::ClearCart => "clear_cart",
            CheckoutStep::RestoreStock => "restore_stock",
            CheckoutStep::CancelOrder => "cancel_order",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
