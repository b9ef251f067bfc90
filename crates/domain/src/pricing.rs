//! Pricing engine.
//!
//! A pure function from cart or order lines to a [`Totals`] breakdown. All
//! rates come from an explicit [`PricingConfig`]; nothing here reads global
//! state, so the same inputs always produce the same totals.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Default flat tax rate in basis points (8%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 800;

/// Delivery speed offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
    Overnight,
}

impl ShippingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingMethod::Standard => "standard",
            ShippingMethod::Express => "express",
            ShippingMethod::Overnight => "overnight",
        }
    }
}

impl std::fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShippingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(ShippingMethod::Standard),
            "express" => Ok(ShippingMethod::Express),
            "overnight" => Ok(ShippingMethod::Overnight),
            other => Err(format!("unknown shipping method '{other}'")),
        }
    }
}

/// Flat shipping cost per method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRates {
    pub standard: Money,
    pub express: Money,
    pub overnight: Money,
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self {
            standard: Money::from_cents(599),
            express: Money::from_cents(1299),
            overnight: Money::from_cents(2499),
        }
    }
}

/// Rates the pricing engine works from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Flat tax rate in basis points applied to the discounted subtotal.
    pub tax_rate_bps: u32,

    /// Shipping rate table.
    pub shipping: ShippingRates,
}

impl PricingConfig {
    /// Creates a config with the given tax rate and the default shipping table.
    pub fn with_tax_rate(tax_rate_bps: u32) -> Self {
        Self {
            tax_rate_bps,
            shipping: ShippingRates::default(),
        }
    }

    /// Returns the shipping cost for a method.
    pub fn shipping_cost(&self, method: ShippingMethod) -> Money {
        match method {
            ShippingMethod::Standard => self.shipping.standard,
            ShippingMethod::Express => self.shipping.express,
            ShippingMethod::Overnight => self.shipping.overnight,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self::with_tax_rate(DEFAULT_TAX_RATE_BPS)
    }
}

/// How a coupon reduces the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CouponDiscount {
    /// Whole-number percentage of the subtotal.
    Percentage(u32),
    /// Fixed amount off.
    Fixed(Money),
}

/// A coupon attached to a cart or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub discount: CouponDiscount,
}

impl Coupon {
    pub fn new(code: impl Into<String>, discount: CouponDiscount) -> Self {
        Self {
            code: code.into(),
            discount,
        }
    }
}

/// Price breakdown of a cart or order.
///
/// Always satisfies `total == subtotal - discount + tax + shipping_cost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping_cost: Money,
    pub total: Money,
}

/// Anything that can be priced as `unit_price x quantity`.
pub trait PricedLine {
    fn unit_price(&self) -> Money;
    fn quantity(&self) -> u32;
}

impl PricedLine for (Money, u32) {
    fn unit_price(&self) -> Money {
        self.0
    }

    fn quantity(&self) -> u32 {
        self.1
    }
}

/// Computes the price breakdown for a set of lines.
///
/// The subtotal is always recomputed from unit prices; stored line totals
/// are ignored. The discount is clamped to `[0, subtotal]`.
pub fn compute_totals<L: PricedLine>(
    lines: &[L],
    coupon: Option<&Coupon>,
    shipping_cost: Money,
    config: &PricingConfig,
) -> Totals {
    let subtotal: Money = lines
        .iter()
        .map(|line| line.unit_price().multiply(line.quantity()))
        .sum();

    let discount = match coupon.map(|c| c.discount) {
        None => Money::zero(),
        Some(CouponDiscount::Percentage(p)) => subtotal.percent(p),
        Some(CouponDiscount::Fixed(amount)) => amount,
    }
    .clamp(Money::zero(), subtotal);

    let tax = (subtotal - discount).basis_points(config.tax_rate_bps);

    Totals {
        subtotal,
        discount,
        tax,
        shipping_cost,
        total: subtotal - discount + tax + shipping_cost,
    }
}
