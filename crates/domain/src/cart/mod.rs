//! Cart aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod value_objects;

pub use aggregate::Cart;
pub use commands::*;
pub use events::{
    CartCheckedOutData, CartClearedData, CartCreatedData, CartEvent, CartExpiredData,
    CouponAppliedData, CouponRemovedData, ItemAddedData, ItemQuantityChangedData,
    ItemRemovedData, ShippingAddressSetData, ShippingMethodSelectedData,
};
pub use service::{CartService, DEFAULT_RETENTION_DAYS};
pub use value_objects::{ItemDetails, ItemId, LineItem, ShippingSelection, VariantSelection};

use thiserror::Error;

use crate::accounts::IdentityError;
use crate::address::AddressError;
use crate::catalog::ProductId;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The cart key is neither an account id nor an anonymous key.
    #[error(transparent)]
    MalformedKey(#[from] IdentityError),

    #[error("Invalid quantity: {0} (must be a positive integer)")]
    InvalidQuantity(i64),

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Cart not found")]
    CartNotFound,

    #[error("Cart already created")]
    AlreadyCreated,

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product exists but is not currently sold.
    #[error("Product unavailable: {0}")]
    ProductUnavailable(String),

    #[error("Variant {name}={value} not found for product {product_id}")]
    VariantNotFound {
        product_id: ProductId,
        name: String,
        value: String,
    },

    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: u32,
    },

    /// Unknown, expired or inactive coupon code.
    #[error("Invalid coupon: {0}")]
    InvalidCoupon(String),

    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
}
