//! Checkout error types.

use common::AggregateId;
use domain::{AddressError, CatalogError, DomainError};
use event_store::EventStoreError;
use thiserror::Error;

use crate::state::CheckoutState;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The customer's cart has no lines. Nothing was written.
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: u32,
    },

    /// Unknown or inactive product, named as the cart shows it.
    #[error("Product unavailable: {0}")]
    ProductUnavailable(String),

    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    #[error("No checkout recorded for order {0}")]
    NotFound(AggregateId),

    #[error("Checkout for order {order_id} is {state} and cannot be resumed")]
    NotResumable {
        order_id: AggregateId,
        state: CheckoutState,
    },

    /// An event other than `CheckoutStarted` was recorded on an empty log.
    #[error("Checkout log has not been started")]
    NotStarted,

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CheckoutError {
    /// Short label used on the failure counter.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutError::EmptyCart => "empty_cart",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::ProductUnavailable(_) => "product_unavailable",
            CheckoutError::InvalidAddress(_) => "invalid_address",
            CheckoutError::NotFound(_) => "not_found",
            CheckoutError::NotResumable { .. } => "not_resumable",
            CheckoutError::NotStarted => "not_started",
            CheckoutError::Catalog(_) => "catalog",
            CheckoutError::Domain(_) => "domain",
            CheckoutError::EventStore(_) => "event_store",
            CheckoutError::Serialization(_) => "serialization",
        }
    }

    /// Returns true if another writer got to a stream first.
    pub fn is_conflict(&self) -> bool {
        match self {
            CheckoutError::Domain(e) => e.is_conflict(),
            CheckoutError::EventStore(e) => e.is_conflict(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
