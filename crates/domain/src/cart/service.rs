//! Cart service: the cart aggregate wired to the catalog and coupon book.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::AggregateId;
use event_store::{EventStore, Version};

use crate::accounts::CustomerKey;
use crate::aggregate::Aggregate;
use crate::catalog::{CatalogStore, Product};
use crate::command::{CommandHandler, CommandResult};
use crate::coupons::CouponBook;
use crate::error::DomainError;
use crate::pricing::PricingConfig;

use super::{
    AddItem, ApplyCoupon, Cart, CartError, CartEvent, ClearCart, ItemDetails, ItemId, RemoveCoupon,
    RemoveItem, SetShippingAddress, SetShippingMethod, UpdateItemQuantity,
};

/// Days a cart may sit untouched before it is reset.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Service for managing carts.
///
/// Carts are created lazily on first access. Before every mutation an idle
/// cart is reset, in the same append as the mutation itself.
pub struct CartService<S: EventStore> {
    handler: CommandHandler<S, Cart>,
    catalog: Arc<dyn CatalogStore>,
    coupons: Arc<dyn CouponBook>,
    pricing: PricingConfig,
    retention: Duration,
}

impl<S: EventStore> CartService<S> {
    /// Creates a new cart service.
    pub fn new(
        store: S,
        catalog: Arc<dyn CatalogStore>,
        coupons: Arc<dyn CouponBook>,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            handler: CommandHandler::new(store),
            catalog,
            coupons,
            pricing,
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
        }
    }

    /// Overrides how long an idle cart is kept.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// How long a cart may sit idle before it is reset.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub fn handler(&self) -> &CommandHandler<S, Cart> {
        &self.handler
    }

    /// Loads a cart without creating it.
    #[tracing::instrument(skip(self, key), fields(key = %key))]
    pub async fn find(&self, key: &CustomerKey) -> Result<Option<Cart>, DomainError> {
        self.handler.load_existing(&key.cart_stream()).await
    }

    /// Returns the cart for a key, creating it or resetting it if idle.
    #[tracing::instrument(skip(self, key), fields(key = %key))]
    pub async fn get_or_create(&self, key: &CustomerKey) -> Result<Cart, DomainError> {
        let result = self
            .mutate(key, None, true, "get_or_create", |_| Ok(vec![]))
            .await?;
        Ok(result.aggregate)
    }

    /// Adds a product to the cart, creating the cart if needed.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, cmd: AddItem) -> Result<CommandResult<Cart>, DomainError> {
        let product = self.sellable_product(&cmd).await?;

        let variant = match &cmd.variant {
            Some(selection) => Some(
                product
                    .find_variant(&selection.name, &selection.value)
                    .ok_or_else(|| CartError::VariantNotFound {
                        product_id: product.id.clone(),
                        name: selection.name.clone(),
                        value: selection.value.clone(),
                    })?,
            ),
            None => None,
        };

        let details = ItemDetails {
            product_id: product.id.clone(),
            name: product.name.clone(),
            sku: product.sku.clone(),
            variant: cmd.variant.clone(),
            unit_price: product.price_for(variant),
        };
        let quantity = cmd.quantity;

        self.mutate(&cmd.key, cmd.expected_version, true, "add_item", move |cart| {
            let events = cart.add_item(details, quantity)?;
            let requested = cart
                .quantity_of_product(&product.id)
                .saturating_add(u32::try_from(quantity).unwrap_or(u32::MAX));
            ensure_stock(&product, requested)?;
            Ok(events)
        })
        .await
    }

    /// Changes a line's quantity, checked against current stock.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        cmd: UpdateItemQuantity,
    ) -> Result<CommandResult<Cart>, DomainError> {
        let cart = self.find(&cmd.key).await?.ok_or(CartError::CartNotFound)?;
        let product_id = cart
            .item(&cmd.item_id)
            .map(|line| line.product_id.clone())
            .ok_or_else(|| CartError::ItemNotFound(cmd.item_id.clone()))?;
        let product = self
            .catalog
            .get_product(&product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        let item_id = cmd.item_id;
        let quantity = cmd.quantity;

        self.mutate(
            &cmd.key,
            cmd.expected_version,
            false,
            "update_item_quantity",
            move |cart| {
                let events = cart.update_item_quantity(&item_id, quantity)?;
                if events.is_empty() {
                    return Ok(events);
                }
                let current = cart.item(&item_id).map_or(0, |line| line.quantity);
                let floored = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
                let requested = cart.quantity_of_product(&product.id) - current + floored;
                ensure_stock(&product, requested)?;
                Ok(events)
            },
        )
        .await
    }

    /// Removes a line; unknown lines are ignored.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, cmd: RemoveItem) -> Result<CommandResult<Cart>, DomainError> {
        let item_id = cmd.item_id;
        self.mutate(&cmd.key, cmd.expected_version, false, "remove_item", move |cart| {
            cart.remove_item(&item_id)
        })
        .await
    }

    /// Empties the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, cmd: ClearCart) -> Result<CommandResult<Cart>, DomainError> {
        self.mutate(&cmd.key, cmd.expected_version, false, "clear", |cart| {
            cart.clear()
        })
        .await
    }

    /// Resolves a coupon code and attaches it.
    #[tracing::instrument(skip(self))]
    pub async fn apply_coupon(&self, cmd: ApplyCoupon) -> Result<CommandResult<Cart>, DomainError> {
        let coupon = self
            .coupons
            .find(&cmd.code)
            .await?
            .and_then(|definition| definition.redeemable_at(Utc::now()))
            .ok_or_else(|| CartError::InvalidCoupon(cmd.code.clone()))?;

        self.mutate(&cmd.key, cmd.expected_version, false, "apply_coupon", move |cart| {
            cart.apply_coupon(coupon)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_coupon(&self, cmd: RemoveCoupon) -> Result<CommandResult<Cart>, DomainError> {
        self.mutate(&cmd.key, cmd.expected_version, false, "remove_coupon", |cart| {
            cart.remove_coupon()
        })
        .await
    }

    /// Selects a shipping method, priced from the rates the cart captured.
    #[tracing::instrument(skip(self))]
    pub async fn set_shipping_method(
        &self,
        cmd: SetShippingMethod,
    ) -> Result<CommandResult<Cart>, DomainError> {
        let method = cmd.method;
        self.mutate(
            &cmd.key,
            cmd.expected_version,
            false,
            "set_shipping_method",
            move |cart| cart.set_shipping_method(method),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_shipping_address(
        &self,
        cmd: SetShippingAddress,
    ) -> Result<CommandResult<Cart>, DomainError> {
        let address = cmd.address;
        self.mutate(
            &cmd.key,
            cmd.expected_version,
            false,
            "set_shipping_address",
            move |cart| cart.set_shipping_address(address),
        )
        .await
    }

    /// Removes the lines that were turned into `order_id`.
    ///
    /// Safe to repeat: a cart already checked out for this order is left alone.
    #[tracing::instrument(skip(self, item_ids))]
    pub async fn check_out(
        &self,
        key: &CustomerKey,
        order_id: &AggregateId,
        item_ids: Vec<ItemId>,
    ) -> Result<CommandResult<Cart>, DomainError> {
        let order_id = order_id.clone();
        self.mutate(key, None, false, "check_out", move |cart| {
            cart.check_out(&order_id, item_ids)
        })
        .await
    }

    async fn sellable_product(&self, cmd: &AddItem) -> Result<Product, DomainError> {
        let product = self
            .catalog
            .get_product(&cmd.product_id)
            .await?
            .ok_or_else(|| CartError::ProductNotFound(cmd.product_id.clone()))?;
        if !product.active {
            return Err(CartError::ProductUnavailable(product.name).into());
        }
        Ok(product)
    }

    /// Runs a cart command, creating or resetting the cart first as needed.
    async fn mutate<F>(
        &self,
        key: &CustomerKey,
        expected_version: Option<Version>,
        create: bool,
        operation: &'static str,
        command: F,
    ) -> Result<CommandResult<Cart>, DomainError>
    where
        F: FnOnce(&Cart) -> Result<Vec<CartEvent>, CartError> + Send,
    {
        let stream = key.cart_stream();
        let now = Utc::now();
        let pricing = self.pricing;
        let retention = self.retention;
        let owner = key.clone();
        let cart_id = stream.clone();

        let result = self
            .handler
            .execute_with_snapshot(&stream, expected_version, move |cart| {
                let mut events = if cart.id().is_none() {
                    if !create {
                        return Err(CartError::CartNotFound);
                    }
                    cart.create(cart_id, owner, pricing)?
                } else {
                    cart.expire(now, retention, pricing)?
                };

                let mut working = cart.clone();
                working.apply_events(events.clone());
                events.extend(command(&working)?);
                Ok(events)
            })
            .await?;

        if result
            .events
            .iter()
            .any(|e| matches!(e, CartEvent::CartExpired(_)))
        {
            tracing::info!(key = %key, "reset idle cart");
        }
        if !result.events.is_empty() {
            metrics::counter!("cart_mutations_total", "operation" => operation).increment(1);
        }

        Ok(result)
    }
}

fn ensure_stock(product: &Product, requested: u32) -> Result<(), CartError> {
    if requested > product.stock {
        return Err(CartError::InsufficientStock {
            product: product.name.clone(),
            requested,
            available: product.stock,
        });
    }
    Ok(())
}
