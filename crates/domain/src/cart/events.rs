//! Cart domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::accounts::CustomerKey;
use crate::address::Address;
use crate::aggregate::DomainEvent;
use crate::money::Money;
use crate::pricing::{Coupon, PricingConfig, ShippingMethod};

use super::{ItemId, LineItem};

/// Events that can occur on a cart aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    CartCreated(CartCreatedData),
    ItemAdded(ItemAddedData),
    ItemQuantityChanged(ItemQuantityChangedData),
    ItemRemoved(ItemRemovedData),
    CouponApplied(CouponAppliedData),
    CouponRemoved(CouponRemovedData),
    ShippingMethodSelected(ShippingMethodSelectedData),
    ShippingAddressSet(ShippingAddressSetData),
    CartCleared(CartClearedData),
    /// The checked-out lines were removed after an order was placed.
    CartCheckedOut(CartCheckedOutData),
    /// The cart sat idle past the retention window and was reset.
    CartExpired(CartExpiredData),
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::CartCreated(_) => "CartCreated",
            CartEvent::ItemAdded(_) => "ItemAdded",
            CartEvent::ItemQuantityChanged(_) => "ItemQuantityChanged",
            CartEvent::ItemRemoved(_) => "ItemRemoved",
            CartEvent::CouponApplied(_) => "CouponApplied",
            CartEvent::CouponRemoved(_) => "CouponRemoved",
            CartEvent::ShippingMethodSelected(_) => "ShippingMethodSelected",
            CartEvent::ShippingAddressSet(_) => "ShippingAddressSet",
            CartEvent::CartCleared(_) => "CartCleared",
            CartEvent::CartCheckedOut(_) => "CartCheckedOut",
            CartEvent::CartExpired(_) => "CartExpired",
        }
    }
}

impl CartEvent {
    /// When the event happened.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CartEvent::CartCreated(d) => d.created_at,
            CartEvent::ItemAdded(d) => d.at,
            CartEvent::ItemQuantityChanged(d) => d.at,
            CartEvent::ItemRemoved(d) => d.at,
            CartEvent::CouponApplied(d) => d.at,
            CartEvent::CouponRemoved(d) => d.at,
            CartEvent::ShippingMethodSelected(d) => d.at,
            CartEvent::ShippingAddressSet(d) => d.at,
            CartEvent::CartCleared(d) => d.at,
            CartEvent::CartCheckedOut(d) => d.at,
            CartEvent::CartExpired(d) => d.at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCreatedData {
    pub cart_id: AggregateId,
    pub key: CustomerKey,
    /// Rates the cart is priced with until it is next reset.
    pub pricing: PricingConfig,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAddedData {
    pub item: LineItem,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemQuantityChangedData {
    pub item_id: ItemId,
    pub old_quantity: u32,
    pub new_quantity: u32,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRemovedData {
    pub item_id: ItemId,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponAppliedData {
    pub coupon: Coupon,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponRemovedData {
    pub code: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingMethodSelectedData {
    pub method: ShippingMethod,
    pub cost: Money,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddressSetData {
    pub address: Address,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartClearedData {
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCheckedOutData {
    pub order_id: AggregateId,
    /// Lines that went into the order.
    pub item_ids: Vec<ItemId>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartExpiredData {
    pub idle_since: DateTime<Utc>,
    pub pricing: PricingConfig,
    pub at: DateTime<Utc>,
}

// Convenience constructors for events
impl CartEvent {
    pub fn cart_created(cart_id: AggregateId, key: CustomerKey, pricing: PricingConfig) -> Self {
        CartEvent::CartCreated(CartCreatedData {
            cart_id,
            key,
            pricing,
            created_at: Utc::now(),
        })
    }

    pub fn item_added(item: LineItem) -> Self {
        CartEvent::ItemAdded(ItemAddedData {
            item,
            at: Utc::now(),
        })
    }

    pub fn item_quantity_changed(item_id: ItemId, old_quantity: u32, new_quantity: u32) -> Self {
        CartEvent::ItemQuantityChanged(ItemQuantityChangedData {
            item_id,
            old_quantity,
            new_quantity,
            at: Utc::now(),
        })
    }

    pub fn item_removed(item_id: ItemId) -> Self {
        CartEvent::ItemRemoved(ItemRemovedData {
            item_id,
            at: Utc::now(),
        })
    }

    pub fn coupon_applied(coupon: Coupon) -> Self {
        CartEvent::CouponApplied(CouponAppliedData {
            coupon,
            at: Utc::now(),
        })
    }

    pub fn coupon_removed(code: String) -> Self {
        CartEvent::CouponRemoved(CouponRemovedData {
            code,
            at: Utc::now(),
        })
    }

    pub fn shipping_method_selected(method: ShippingMethod, cost: Money) -> Self {
        CartEvent::ShippingMethodSelected(ShippingMethodSelectedData {
            method,
            cost,
            at: Utc::now(),
        })
    }

    pub fn shipping_address_set(address: Address) -> Self {
        CartEvent::ShippingAddressSet(ShippingAddressSetData {
            address,
            at: Utc::now(),
        })
    }

    pub fn cart_cleared() -> Self {
        CartEvent::CartCleared(CartClearedData { at: Utc::now() })
    }

    pub fn cart_checked_out(order_id: AggregateId, item_ids: Vec<ItemId>) -> Self {
        CartEvent::CartCheckedOut(CartCheckedOutData {
            order_id,
            item_ids,
            at: Utc::now(),
        })
    }

    pub fn cart_expired(idle_since: DateTime<Utc>, pricing: PricingConfig, at: DateTime<Utc>) -> Self {
        CartEvent::CartExpired(CartExpiredData {
            idle_since,
            pricing,
            at,
        })
    }
}
