//! Cart endpoints, keyed by account id or anonymous `temp_` key.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use domain::cart::{
    AddItem, ApplyCoupon, ClearCart, LineItem, RemoveCoupon, RemoveItem, SetShippingAddress,
    SetShippingMethod, ShippingSelection, UpdateItemQuantity, VariantSelection,
};
use domain::{Address, Aggregate, Cart, Coupon, CustomerKey, Principal, ShippingMethod, Totals};
use event_store::{EventStore, Version};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::{ApiJson, OptionalUser};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "one")]
    pub quantity: i64,
    pub variant: Option<VariantSelection>,
    pub expected_version: Option<Version>,
}

fn one() -> i64 {
    1
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
    pub expected_version: Option<Version>,
}

#[derive(Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
    pub expected_version: Option<Version>,
}

#[derive(Deserialize)]
pub struct ShippingMethodRequest {
    pub method: String,
    pub expected_version: Option<Version>,
}

#[derive(Deserialize)]
pub struct ShippingAddressRequest {
    #[serde(flatten)]
    pub address: Address,
    pub expected_version: Option<Version>,
}

/// Query string for DELETE endpoints, which carry no body.
#[derive(Deserialize)]
pub struct VersionQuery {
    pub expected_version: Option<i64>,
}

impl VersionQuery {
    fn version(&self) -> Option<Version> {
        self.expected_version.map(Version::new)
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub key: String,
    pub version: Version,
    pub items: Vec<LineItem>,
    pub item_count: usize,
    pub total_quantity: u32,
    pub coupon: Option<Coupon>,
    pub shipping: Option<ShippingSelection>,
    pub shipping_address: Option<Address>,
    pub totals: Totals,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartResponse {
    fn new(key: &CustomerKey, cart: &Cart) -> Self {
        Self {
            key: key.to_string(),
            version: cart.version(),
            items: cart.items().to_vec(),
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            coupon: cart.coupon().cloned(),
            shipping: cart.shipping(),
            shipping_address: cart.shipping_address().cloned(),
            totals: cart.totals(),
            updated_at: cart.updated_at(),
        }
    }
}

// -- Handlers --

/// Parses the path key.
///
/// Anonymous `temp_` carts are open to anyone holding the key. Account
/// carts need the owner's session, or an administrator's.
async fn resolve_key<S: EventStore + Clone + 'static>(
    state: &AppState<S>,
    raw: &str,
    caller: Option<&Principal>,
) -> Result<CustomerKey, ApiError> {
    let key = CustomerKey::parse(raw)?;
    let Some(account_id) = key.account_id() else {
        return Ok(key);
    };

    let caller = caller.ok_or(ApiError::Unauthorized)?;
    if caller.is_admin() {
        if !state.accounts.exists(account_id).await {
            return Err(ApiError::NotFound(format!("Account {account_id} not found")));
        }
    } else if &caller.account_id != account_id {
        return Err(ApiError::Forbidden);
    }
    Ok(key)
}

/// GET /cart/{key} fetches the cart, creating it on first access.
#[tracing::instrument(skip(state, caller))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    OptionalUser(caller): OptionalUser,
) -> Result<Json<CartResponse>, ApiError> {
    let key = resolve_key(&state, &key, caller.as_ref()).await?;
    let cart = state.carts.get_or_create(&key).await?;
    Ok(Json(CartResponse::new(&key, &cart)))
}

/// POST /cart/{key}/add
#[tracing::instrument(skip(state, caller, req))]
pub async fn add_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    OptionalUser(caller): OptionalUser,
    ApiJson(req): ApiJson<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let key = resolve_key(&state, &key, caller.as_ref()).await?;
    let mut cmd = AddItem::new(key.clone(), req.product_id, req.quantity);
    if let Some(variant) = req.variant {
        cmd = cmd.with_variant(variant);
    }
    let result = state
        .carts
        .add_item(cmd.expecting(req.expected_version))
        .await?;
    Ok(Json(CartResponse::new(&key, &result.aggregate)))
}

/// PUT /cart/{key}/update/{item_id}
#[tracing::instrument(skip(state, caller, req))]
pub async fn update_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((key, item_id)): Path<(String, String)>,
    OptionalUser(caller): OptionalUser,
    ApiJson(req): ApiJson<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let key = resolve_key(&state, &key, caller.as_ref()).await?;
    let cmd = UpdateItemQuantity::new(key.clone(), item_id, req.quantity)
        .expecting(req.expected_version);
    let result = state.carts.update_item_quantity(cmd).await?;
    Ok(Json(CartResponse::new(&key, &result.aggregate)))
}

/// DELETE /cart/{key}/remove/{item_id}; unknown items are ignored.
#[tracing::instrument(skip(state, caller, query))]
pub async fn remove_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((key, item_id)): Path<(String, String)>,
    OptionalUser(caller): OptionalUser,
    Query(query): Query<VersionQuery>,
) -> Result<Json<CartResponse>, ApiError> {
    let key = resolve_key(&state, &key, caller.as_ref()).await?;
    let cmd = RemoveItem::new(key.clone(), item_id).expecting(query.version());
    let result = state.carts.remove_item(cmd).await?;
    Ok(Json(CartResponse::new(&key, &result.aggregate)))
}

/// DELETE /cart/{key}/clear
#[tracing::instrument(skip(state, caller, query))]
pub async fn clear<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    OptionalUser(caller): OptionalUser,
    Query(query): Query<VersionQuery>,
) -> Result<Json<CartResponse>, ApiError> {
    let key = resolve_key(&state, &key, caller.as_ref()).await?;
    let cmd = ClearCart::new(key.clone()).expecting(query.version());
    let result = state.carts.clear(cmd).await?;
    Ok(Json(CartResponse::new(&key, &result.aggregate)))
}

/// POST /cart/{key}/apply-coupon
#[tracing::instrument(skip(state, caller, req))]
pub async fn apply_coupon<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    OptionalUser(caller): OptionalUser,
    ApiJson(req): ApiJson<ApplyCouponRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let key = resolve_key(&state, &key, caller.as_ref()).await?;
    let cmd = ApplyCoupon::new(key.clone(), req.code).expecting(req.expected_version);
    let result = state.carts.apply_coupon(cmd).await?;
    Ok(Json(CartResponse::new(&key, &result.aggregate)))
}

/// DELETE /cart/{key}/coupon
#[tracing::instrument(skip(state, caller, query))]
pub async fn remove_coupon<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    OptionalUser(caller): OptionalUser,
    Query(query): Query<VersionQuery>,
) -> Result<Json<CartResponse>, ApiError> {
    let key = resolve_key(&state, &key, caller.as_ref()).await?;
    let cmd = RemoveCoupon::new(key.clone()).expecting(query.version());
    let result = state.carts.remove_coupon(cmd).await?;
    Ok(Json(CartResponse::new(&key, &result.aggregate)))
}

/// PUT /cart/{key}/shipping-method
#[tracing::instrument(skip(state, caller, req))]
pub async fn set_shipping_method<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    OptionalUser(caller): OptionalUser,
    ApiJson(req): ApiJson<ShippingMethodRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let key = resolve_key(&state, &key, caller.as_ref()).await?;
    let method: ShippingMethod = req
        .method
        .parse()
        .map_err(|message| ApiError::Validation {
            field: "method",
            message,
        })?;
    let cmd = SetShippingMethod::new(key.clone(), method).expecting(req.expected_version);
    let result = state.carts.set_shipping_method(cmd).await?;
    Ok(Json(CartResponse::new(&key, &result.aggregate)))
}

/// PUT /cart/{key}/shipping-address
#[tracing::instrument(skip(state, caller, req))]
pub async fn set_shipping_address<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    OptionalUser(caller): OptionalUser,
    ApiJson(req): ApiJson<ShippingAddressRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let key = resolve_key(&state, &key, caller.as_ref()).await?;
    let cmd = SetShippingAddress::new(key.clone(), req.address).expecting(req.expected_version);
    let result = state.carts.set_shipping_address(cmd).await?;
    Ok(Json(CartResponse::new(&key, &result.aggregate)))
}
