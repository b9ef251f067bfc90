//! Catalog store collaborator.
//!
//! Products, prices and stock live outside the marketplace core. The core
//! reads products and adjusts stock only through [`CatalogStore`], whose
//! stock operations are single atomic arithmetic updates.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::money::Money;

/// Product identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A selectable option of a product, e.g. size=M.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub name: String,
    pub value: String,
    /// Overrides the product price when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub price: Money,
    pub stock: u32,
    pub active: bool,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Creates an active product without variants.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        sku: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sku: sku.into(),
            price,
            stock,
            active: true,
            variants: Vec::new(),
        }
    }

    /// Adds a variant (builder style).
    pub fn with_variant(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        price: Option<Money>,
    ) -> Self {
        self.variants.push(ProductVariant {
            name: name.into(),
            value: value.into(),
            price,
        });
        self
    }

    /// Finds a variant by option name and value.
    pub fn find_variant(&self, name: &str, value: &str) -> Option<&ProductVariant> {
        self.variants
            .iter()
            .find(|v| v.name == name && v.value == value)
    }

    /// Current price for the product or one of its variants.
    pub fn price_for(&self, variant: Option<&ProductVariant>) -> Money {
        variant.and_then(|v| v.price).unwrap_or(self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A decrement would have taken stock below zero. Nothing was changed.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The backing catalog could not be reached.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read access to products plus atomic stock adjustment.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Loads a product, or None if the id is unknown.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;

    /// Atomically subtracts `quantity` from stock, returning the remaining stock.
    ///
    /// Rejected with `InsufficientStock` when the result would be negative.
    async fn decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<u32, CatalogError>;

    /// Atomically adds `quantity` back to stock, returning the new stock.
    async fn restore_stock(&self, id: &ProductId, quantity: u32) -> Result<u32, CatalogError>;
}

/// Catalog held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product.
    pub async fn upsert(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }

    /// Marks a product active or inactive. Returns false if unknown.
    pub async fn set_active(&self, id: &ProductId, active: bool) -> bool {
        match self.products.write().await.get_mut(id) {
            Some(product) => {
                product.active = active;
                true
            }
            None => false,
        }
    }

    /// Current stock of a product.
    pub async fn stock_of(&self, id: &ProductId) -> Option<u32> {
        self.products.read().await.get(id).map(|p| p.stock)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<u32, CatalogError> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(id)
            .ok_or_else(|| CatalogError::ProductNotFound(id.clone()))?;

        let available = product.stock;
        product.stock =
            available
                .checked_sub(quantity)
                .ok_or_else(|| CatalogError::InsufficientStock {
                    product_id: id.clone(),
                    requested: quantity,
                    available,
                })?;
        Ok(product.stock)
    }

    async fn restore_stock(&self, id: &ProductId, quantity: u32) -> Result<u32, CatalogError> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(id)
            .ok_or_else(|| CatalogError::ProductNotFound(id.clone()))?;

        product.stock = product.stock.saturating_add(quantity);
        Ok(product.stock)
    }
}
