//! Checkout lifecycle.

use serde::{Deserialize, Serialize};

/// Where a checkout is in its lifecycle.
///
/// ```text
/// NotStarted ──► Running ──┬──────────────────────────► Completed
///                          ├──► Compensating ─────────► Failed
///                          └──► Stalled ──(resume)──► Running | Compensating
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    #[default]
    NotStarted,

    /// Forward steps are being executed.
    Running,

    /// Stock commit failed and earlier effects are being undone.
    Compensating,

    /// Order placed, stock committed, cart cleared.
    Completed,

    /// Rolled back; no live order remains.
    Failed,

    /// A step failed after the order was persisted. Waiting for a resume.
    Stalled,
}

impl CheckoutState {
    /// Returns true if no further step will run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Completed | CheckoutState::Failed)
    }

    /// Returns true if `resume` may pick the checkout up.
    pub fn can_resume(&self) -> bool {
        matches!(
            self,
            CheckoutState::Running | CheckoutState::Compensating | CheckoutState::Stalled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::NotStarted => "not_started",
            CheckoutState::Running => "running",
            CheckoutState::Compensating => "compensating",
            CheckoutState::Completed => "completed",
            CheckoutState::Failed => "failed",
            CheckoutState::Stalled => "stalled",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
