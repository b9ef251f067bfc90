//! Cart aggregate implementation.

use chrono::{DateTime, Duration, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::accounts::CustomerKey;
use crate::address::Address;
use crate::aggregate::{Aggregate, SnapshotCapable};
use crate::catalog::ProductId;
use crate::money::Money;
use crate::pricing::{Coupon, PricingConfig, ShippingMethod, Totals, compute_totals};

use super::{CartError, CartEvent, ItemDetails, ItemId, LineItem, ShippingSelection};

/// Cart aggregate root.
///
/// Totals are recomputed whenever an event is applied, so a loaded cart
/// never carries a stale price breakdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    key: Option<CustomerKey>,

    items: Vec<LineItem>,

    coupon: Option<Coupon>,

    shipping: Option<ShippingSelection>,

    shipping_address: Option<Address>,

    pricing: PricingConfig,

    totals: Totals,

    created_at: Option<DateTime<Utc>>,

    updated_at: Option<DateTime<Utc>>,

    /// Order most recently placed from this cart.
    last_order_id: Option<AggregateId>,
}

impl Aggregate for Cart {
    type Event = CartEvent;
    type Error = CartError;

    fn aggregate_type() -> &'static str {
        "Cart"
    }

    fn id(&self) -> Option<&AggregateId> {
        self.id.as_ref()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        self.updated_at = Some(event.occurred_at());

        match event {
            CartEvent::CartCreated(data) => {
                self.id = Some(data.cart_id);
                self.key = Some(data.key);
                self.pricing = data.pricing;
                self.created_at = Some(data.created_at);
            }
            CartEvent::ItemAdded(data) => self.items.push(data.item),
            CartEvent::ItemQuantityChanged(data) => {
                if let Some(line) = self.items.iter_mut().find(|l| l.item_id == data.item_id) {
                    line.set_quantity(data.new_quantity);
                }
            }
            CartEvent::ItemRemoved(data) => self.items.retain(|l| l.item_id != data.item_id),
            CartEvent::CouponApplied(data) => self.coupon = Some(data.coupon),
            CartEvent::CouponRemoved(_) => self.coupon = None,
            CartEvent::ShippingMethodSelected(data) => {
                self.shipping = Some(ShippingSelection {
                    method: data.method,
                    cost: data.cost,
                });
            }
            CartEvent::ShippingAddressSet(data) => self.shipping_address = Some(data.address),
            CartEvent::CartCleared(_) => {
                self.items.clear();
                self.coupon = None;
            }
            CartEvent::CartCheckedOut(data) => {
                self.items.retain(|l| !data.item_ids.contains(&l.item_id));
                self.coupon = None;
                self.last_order_id = Some(data.order_id);
            }
            CartEvent::CartExpired(data) => {
                self.items.clear();
                self.coupon = None;
                self.shipping = None;
                self.shipping_address = None;
                self.pricing = data.pricing;
            }
        }

        self.recalculate();
    }
}

impl SnapshotCapable for Cart {
    fn snapshot_interval() -> usize {
        50
    }
}

// Query methods
impl Cart {
    pub fn key(&self) -> Option<&CustomerKey> {
        self.key.as_ref()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, item_id: &ItemId) -> Option<&LineItem> {
        self.items.iter().find(|l| &l.item_id == item_id)
    }

    pub fn coupon(&self) -> Option<&Coupon> {
        self.coupon.as_ref()
    }

    pub fn shipping(&self) -> Option<ShippingSelection> {
        self.shipping
    }

    pub fn shipping_address(&self) -> Option<&Address> {
        self.shipping_address.as_ref()
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn last_order_id(&self) -> Option<&AggregateId> {
        self.last_order_id.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of quantities over all lines.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|l| l.quantity).sum()
    }

    /// Units of a product across all of its variant lines.
    pub fn quantity_of_product(&self, product_id: &ProductId) -> u32 {
        self.items
            .iter()
            .filter(|l| &l.product_id == product_id)
            .map(|l| l.quantity)
            .sum()
    }

    /// Returns true if the cart has not been touched within `retention`.
    pub fn is_idle(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        self.updated_at.is_some_and(|at| at + retention <= now)
    }

    fn has_state(&self) -> bool {
        !self.items.is_empty()
            || self.coupon.is_some()
            || self.shipping.is_some()
            || self.shipping_address.is_some()
    }

    fn shipping_cost(&self) -> Money {
        self.shipping.map(|s| s.cost).unwrap_or_default()
    }

    fn recalculate(&mut self) {
        self.totals = compute_totals(
            &self.items,
            self.coupon.as_ref(),
            self.shipping_cost(),
            &self.pricing,
        );
    }

    fn ensure_created(&self) -> Result<(), CartError> {
        if self.id.is_none() {
            return Err(CartError::CartNotFound);
        }
        Ok(())
    }
}

fn positive_quantity(quantity: i64) -> Result<u32, CartError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or(CartError::InvalidQuantity(quantity))
}

// Command methods (return events)
impl Cart {
    /// Opens the cart for a customer key.
    pub fn create(
        &self,
        cart_id: AggregateId,
        key: CustomerKey,
        pricing: PricingConfig,
    ) -> Result<Vec<CartEvent>, CartError> {
        if self.id.is_some() {
            return Err(CartError::AlreadyCreated);
        }
        Ok(vec![CartEvent::cart_created(cart_id, key, pricing)])
    }

    /// Adds units of a product, merging into an existing line for the same
    /// product and variant value.
    ///
    /// A merged line keeps the unit price it was first added at.
    pub fn add_item(&self, details: ItemDetails, quantity: i64) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_created()?;
        let quantity = positive_quantity(quantity)?;

        let existing = self
            .items
            .iter()
            .find(|l| l.matches(&details.product_id, details.variant.as_ref()));

        match existing {
            Some(line) => Ok(vec![CartEvent::item_quantity_changed(
                line.item_id.clone(),
                line.quantity,
                line.quantity.saturating_add(quantity),
            )]),
            None => Ok(vec![CartEvent::item_added(LineItem::new(
                ItemId::new(),
                details,
                quantity,
            ))]),
        }
    }

    /// Sets a line's quantity. Values below 1 are raised to 1.
    pub fn update_item_quantity(
        &self,
        item_id: &ItemId,
        quantity: i64,
    ) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_created()?;
        let line = self
            .item(item_id)
            .ok_or_else(|| CartError::ItemNotFound(item_id.clone()))?;
        let quantity = positive_quantity(quantity.max(1))?;

        if quantity == line.quantity {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::item_quantity_changed(
            item_id.clone(),
            line.quantity,
            quantity,
        )])
    }

    /// Removes a line. Removing an unknown line changes nothing.
    pub fn remove_item(&self, item_id: &ItemId) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_created()?;
        if self.item(item_id).is_none() {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::item_removed(item_id.clone())])
    }

    /// Attaches a coupon, replacing any coupon already applied.
    pub fn apply_coupon(&self, coupon: Coupon) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_created()?;
        if self.coupon.as_ref() == Some(&coupon) {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::coupon_applied(coupon)])
    }

    pub fn remove_coupon(&self) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_created()?;
        Ok(self
            .coupon
            .as_ref()
            .map(|c| CartEvent::coupon_removed(c.code.clone()))
            .into_iter()
            .collect())
    }

    /// Priced from the rate table the cart captured, which is also what
    /// the order will be priced from.
    pub fn set_shipping_method(&self, method: ShippingMethod) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_created()?;
        let cost = self.pricing.shipping_cost(method);
        Ok(vec![CartEvent::shipping_method_selected(method, cost)])
    }

    pub fn set_shipping_address(&self, address: Address) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_created()?;
        address.validate()?;
        Ok(vec![CartEvent::shipping_address_set(address)])
    }

    /// Empties the lines and drops the coupon.
    pub fn clear(&self) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_created()?;
        if self.items.is_empty() && self.coupon.is_none() {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::cart_cleared()])
    }

    /// Removes the lines that went into `order_id`.
    ///
    /// Repeating this for the same order is a no-op, which lets an
    /// interrupted checkout retry it safely.
    pub fn check_out(
        &self,
        order_id: &AggregateId,
        item_ids: Vec<ItemId>,
    ) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_created()?;
        if self.last_order_id.as_ref() == Some(order_id) {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::cart_checked_out(order_id.clone(), item_ids)])
    }

    /// Resets a cart that has been idle for longer than `retention`.
    pub fn expire(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
        pricing: PricingConfig,
    ) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_created()?;
        match self.updated_at {
            Some(idle_since) if self.is_idle(now, retention) && self.has_state() => {
                Ok(vec![CartEvent::cart_expired(idle_since, pricing, now)])
            }
            _ => Ok(vec![]),
        }
    }
}
