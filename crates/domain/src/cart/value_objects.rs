//! Value objects for the cart domain.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::ProductId;
use crate::money::Money;
use crate::pricing::{PricedLine, ShippingMethod};

/// Identifier of a cart line, stable across quantity changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The variant option a customer picked, e.g. size=M.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantSelection {
    pub name: String,
    pub value: String,
}

impl VariantSelection {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Product details captured when a line is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub variant: Option<VariantSelection>,
    pub unit_price: Money,
}

/// A line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_id: ItemId,
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSelection>,
    pub quantity: u32,
    /// Price per unit at the time the line was added.
    pub unit_price: Money,
    pub line_total: Money,
}

impl LineItem {
    pub fn new(item_id: ItemId, details: ItemDetails, quantity: u32) -> Self {
        Self {
            item_id,
            product_id: details.product_id,
            name: details.name,
            sku: details.sku,
            variant: details.variant,
            quantity,
            unit_price: details.unit_price,
            line_total: details.unit_price.multiply(quantity),
        }
    }

    /// Returns true if this line holds the given product and variant value.
    pub fn matches(&self, product_id: &ProductId, variant: Option<&VariantSelection>) -> bool {
        &self.product_id == product_id
            && self.variant.as_ref().map(|v| &v.value) == variant.map(|v| &v.value)
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.line_total = self.unit_price.multiply(quantity);
    }
}

impl PricedLine for LineItem {
    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Chosen delivery method and what it costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSelection {
    pub method: ShippingMethod,
    pub cost: Money,
}
