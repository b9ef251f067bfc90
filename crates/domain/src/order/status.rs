//! Order state machine.

use serde::{Deserialize, Serialize};

/// The state of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Confirmed ──► Processing ──► Shipped ──► Delivered
///    │            │
///    └────────────┴──► Cancelled
///
/// any state except Refunded ──(full refund)──► Refunded
/// ```
/// Administrators may skip forward along the main chain but never move back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Position on the fulfilment chain, or None for cancelled/refunded.
    fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Processing => Some(2),
            OrderStatus::Shipped => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Cancelled | OrderStatus::Refunded => None,
        }
    }

    /// Returns true if the customer or an administrator may cancel.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    /// Returns true if no fulfilment transition can leave this state.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Returns true if an administrator may move the order forward to `target`.
    ///
    /// Only covers the fulfilment chain; cancellation and refunds have
    /// their own rules.
    pub fn can_advance_to(&self, target: OrderStatus) -> bool {
        if self.is_final() {
            return false;
        }
        matches!((self.rank(), target.rank()), (Some(from), Some(to)) if to > from)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}

/// Where the money for an order stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    PartiallyRefunded,
    Refunded,
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    const ALL: [OrderStatus; 7] = [
        Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded,
    ];

    #[test]
    fn default_status_is_pending() {
        assert_eq!(OrderStatus::default(), Pending);
    }

    #[test]
    fn only_pending_and_confirmed_can_cancel() {
        let cancellable: Vec<_> = ALL.into_iter().filter(|s| s.can_cancel()).collect();
        assert_eq!(cancellable, vec![Pending, Confirmed]);
    }

    #[test]
    fn advancing_is_forward_only_and_may_skip() {
        assert!(Pending.can_advance_to(Confirmed));
        assert!(Pending.can_advance_to(Shipped));
        assert!(Processing.can_advance_to(Delivered));

        assert!(!Shipped.can_advance_to(Processing));
        assert!(!Confirmed.can_advance_to(Confirmed));
        assert!(!Delivered.can_advance_to(Delivered));
    }

    #[test]
    fn final_states_never_advance() {
        for from in [Delivered, Cancelled, Refunded] {
            for to in ALL {
                assert!(!from.can_advance_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn cancelled_and_refunded_are_not_chain_targets() {
        assert!(!Pending.can_advance_to(Cancelled));
        assert!(!Shipped.can_advance_to(Refunded));
    }

    #[test]
    fn parse_round_trips_display() {
        for status in ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>(), Ok(status));
        }
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn payment_status_wire_names() {
        assert_eq!(
            serde_json::to_value(PaymentStatus::PartiallyRefunded).unwrap(),
            serde_json::json!("partially_refunded")
        );
    }
}
