//! Value objects for the order domain.

use chrono::{DateTime, NaiveDate, Utc};
use event_store::SequenceAllocator;
use serde::{Deserialize, Serialize};

use crate::cart::VariantSelection;
use crate::catalog::ProductId;
use crate::money::Money;
use crate::pricing::PricedLine;

use super::OrderStatus;

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Paypal,
    CashOnDelivery,
}

impl PaymentMethod {
    /// Returns true once an order in `status` counts as paid.
    ///
    /// Card and PayPal orders are paid once confirmed; cash on delivery
    /// only once delivered.
    pub fn is_paid_at(&self, status: OrderStatus) -> bool {
        match self {
            PaymentMethod::CashOnDelivery => status == OrderStatus::Delivered,
            PaymentMethod::Card | PaymentMethod::Paypal => !matches!(
                status,
                OrderStatus::Pending | OrderStatus::Cancelled | OrderStatus::Refunded
            ),
        }
    }
}

/// How a refund is paid back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
    #[default]
    OriginalPayment,
    StoreCredit,
    Manual,
}

/// An immutable copy of a cart line taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSelection>,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

impl OrderLine {
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        sku: impl Into<String>,
        variant: Option<VariantSelection>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            sku: sku.into(),
            variant,
            quantity,
            unit_price,
            line_total: unit_price.multiply(quantity),
        }
    }
}

impl PricedLine for OrderLine {
    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// One entry in an order's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: OrderStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub amount: Money,
    pub reason: String,
    pub method: RefundMethod,
    pub refunded_at: DateTime<Utc>,
}

/// Human-facing order number: `ORD` + `YYMMDD` + a 4-digit daily counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Formats the number for a day and that day's sequence value.
    pub fn format(date: NaiveDate, sequence: u64) -> Self {
        Self(format!("ORD{}{:04}", date.format("%y%m%d"), sequence))
    }

    /// Name of the counter that numbers orders placed on `date`.
    pub fn sequence_name(date: NaiveDate) -> String {
        format!("orders-{}", date.format("%y%m%d"))
    }

    /// Allocates the next order number for `date`.
    ///
    /// The counter increment is atomic, so concurrent checkouts on the same
    /// day always receive distinct, increasing numbers.
    pub async fn allocate(
        allocator: &dyn SequenceAllocator,
        date: NaiveDate,
    ) -> Result<Self, event_store::EventStoreError> {
        let sequence = allocator.next_value(&Self::sequence_name(date)).await?;
        Ok(Self::format(date, sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
