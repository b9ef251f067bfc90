//! Cart commands.
//!
//! Every mutation may carry the cart version the caller last saw; when
//! present, the write only succeeds if nobody changed the cart since.

use common::AggregateId;
use event_store::Version;

use crate::accounts::CustomerKey;
use crate::address::Address;
use crate::catalog::ProductId;
use crate::command::Command;
use crate::pricing::ShippingMethod;

use super::{Cart, ItemId, VariantSelection};

macro_rules! cart_command {
    ($name:ident) => {
        impl $name {
            /// Makes the command conditional on the cart still being at `version`.
            pub fn expecting(mut self, version: Option<Version>) -> Self {
                self.expected_version = version;
                self
            }
        }

        impl Command for $name {
            type Aggregate = Cart;

            fn aggregate_id(&self) -> AggregateId {
                self.key.cart_stream()
            }
        }
    };
}

/// Command to add units of a product to a cart.
#[derive(Debug, Clone)]
pub struct AddItem {
    pub key: CustomerKey,
    pub product_id: ProductId,
    pub quantity: i64,
    pub variant: Option<VariantSelection>,
    pub expected_version: Option<Version>,
}

impl AddItem {
    pub fn new(key: CustomerKey, product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            key,
            product_id: product_id.into(),
            quantity,
            variant: None,
            expected_version: None,
        }
    }

    pub fn with_variant(mut self, variant: VariantSelection) -> Self {
        self.variant = Some(variant);
        self
    }
}

cart_command!(AddItem);

/// Command to change the quantity of a line.
#[derive(Debug, Clone)]
pub struct UpdateItemQuantity {
    pub key: CustomerKey,
    pub item_id: ItemId,
    pub quantity: i64,
    pub expected_version: Option<Version>,
}

impl UpdateItemQuantity {
    pub fn new(key: CustomerKey, item_id: impl Into<ItemId>, quantity: i64) -> Self {
        Self {
            key,
            item_id: item_id.into(),
            quantity,
            expected_version: None,
        }
    }
}

cart_command!(UpdateItemQuantity);

/// Command to remove a line.
#[derive(Debug, Clone)]
pub struct RemoveItem {
    pub key: CustomerKey,
    pub item_id: ItemId,
    pub expected_version: Option<Version>,
}

impl RemoveItem {
    pub fn new(key: CustomerKey, item_id: impl Into<ItemId>) -> Self {
        Self {
            key,
            item_id: item_id.into(),
            expected_version: None,
        }
    }
}

cart_command!(RemoveItem);

/// Command to empty a cart.
#[derive(Debug, Clone)]
pub struct ClearCart {
    pub key: CustomerKey,
    pub expected_version: Option<Version>,
}

impl ClearCart {
    pub fn new(key: CustomerKey) -> Self {
        Self {
            key,
            expected_version: None,
        }
    }
}

cart_command!(ClearCart);

/// Command to attach a coupon by code.
#[derive(Debug, Clone)]
pub struct ApplyCoupon {
    pub key: CustomerKey,
    pub code: String,
    pub expected_version: Option<Version>,
}

impl ApplyCoupon {
    pub fn new(key: CustomerKey, code: impl Into<String>) -> Self {
        Self {
            key,
            code: code.into(),
            expected_version: None,
        }
    }
}

cart_command!(ApplyCoupon);

/// Command to detach the current coupon.
#[derive(Debug, Clone)]
pub struct RemoveCoupon {
    pub key: CustomerKey,
    pub expected_version: Option<Version>,
}

impl RemoveCoupon {
    pub fn new(key: CustomerKey) -> Self {
        Self {
            key,
            expected_version: None,
        }
    }
}

cart_command!(RemoveCoupon);

/// Command to choose a shipping method.
#[derive(Debug, Clone)]
pub struct SetShippingMethod {
    pub key: CustomerKey,
    pub method: ShippingMethod,
    pub expected_version: Option<Version>,
}

impl SetShippingMethod {
    pub fn new(key: CustomerKey, method: ShippingMethod) -> Self {
        Self {
            key,
            method,
            expected_version: None,
        }
    }
}

cart_command!(SetShippingMethod);

/// Command to set the delivery address.
#[derive(Debug, Clone)]
pub struct SetShippingAddress {
    pub key: CustomerKey,
    pub address: Address,
    pub expected_version: Option<Version>,
}

impl SetShippingAddress {
    pub fn new(key: CustomerKey, address: Address) -> Self {
        Self {
            key,
            address,
            expected_version: None,
        }
    }
}

cart_command!(SetShippingAddress);
