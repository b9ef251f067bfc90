//! Domain layer for the marketplace backend.
//!
//! This crate provides:
//! - Aggregate, DomainEvent and CommandHandler for event-sourced entities
//! - Money and the pricing engine
//! - The cart and order aggregates with their application services
//! - Seams to the product catalog, coupon book and account directory

pub mod accounts;
pub mod address;
pub mod aggregate;
pub mod cart;
pub mod catalog;
pub mod command;
pub mod coupons;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;

pub use accounts::{
    AccountDirectory, AccountId, CustomerKey, IdentityError, InMemoryAccountDirectory, Principal,
    Role,
};
pub use address::{Address, AddressError};
pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use cart::{Cart, CartError, CartEvent, CartService};
pub use catalog::{CatalogError, CatalogStore, InMemoryCatalog, Product, ProductId, ProductVariant};
pub use command::{Command, CommandHandler, CommandResult};
pub use coupons::{CouponBook, CouponDefinition, InMemoryCouponBook};
pub use error::DomainError;
pub use money::Money;
pub use order::{
    Order, OrderError, OrderEvent, OrderLine, OrderNumber, OrderService, OrderStatus,
    PaymentMethod, PaymentStatus, RefundMethod,
};
pub use pricing::{
    Coupon, CouponDiscount, PricingConfig, ShippingMethod, ShippingRates, Totals, compute_totals,
};
