//! HTTP route handlers.

pub mod admin;
pub mod carts;
pub mod ops;
pub mod orders;
