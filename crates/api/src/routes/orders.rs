//! Customer order endpoints: checkout, listing, lookup and cancellation.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use checkout::{CheckoutReceipt, CheckoutRequest, CheckoutState};
use common::AggregateId;
use domain::order::{Refund, TimelineEntry};
use domain::{
    Address, Aggregate, Money, Order, OrderLine, OrderNumber, OrderStatus, PaymentMethod,
    PaymentStatus, Principal, ShippingMethod, Totals,
};
use event_store::{EventStore, Version};
use projections::OrderSummary;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::{ApiJson, CurrentUser};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub payment_method: PaymentMethod,
    pub billing_address: Address,
    pub shipping_address: Option<Address>,
    pub shipping_method: Option<ShippingMethod>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub version: Version,
    pub order_number: Option<OrderNumber>,
    pub customer: Option<String>,
    pub status: OrderStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
    pub lines: Vec<OrderLine>,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
    pub shipping_method: Option<ShippingMethod>,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
    pub totals: Totals,
    pub total_refunded: Money,
    pub refunds: Vec<Refund>,
    pub timeline: Vec<TimelineEntry>,
    pub tracking_number: Option<String>,
    pub cancellation_reason: Option<String>,
    pub stock_committed: bool,
    pub placed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().map(|id| id.to_string()).unwrap_or_default(),
            version: order.version(),
            order_number: order.order_number().cloned(),
            customer: order.customer().map(|c| c.to_string()),
            status: order.status(),
            payment_method: order.payment_method(),
            payment_status: order.payment_status(),
            lines: order.lines().to_vec(),
            billing_address: order.billing_address().cloned(),
            shipping_address: order.shipping_address().cloned(),
            shipping_method: order.shipping_method(),
            coupon_code: order.coupon_code().map(str::to_string),
            notes: order.notes().map(str::to_string),
            totals: order.totals(),
            total_refunded: order.total_refunded(),
            refunds: order.refunds().to_vec(),
            timeline: order.timeline().to_vec(),
            tracking_number: order.tracking_number().map(str::to_string),
            cancellation_reason: order.cancellation_reason().map(str::to_string),
            stock_committed: order.stock_committed(),
            placed_at: order.placed_at(),
            updated_at: order.updated_at(),
        }
    }
}

/// An order together with the state of the checkout that produced it.
#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub checkout_state: CheckoutState,
}

impl From<CheckoutReceipt> for CheckoutResponse {
    fn from(receipt: CheckoutReceipt) -> Self {
        Self {
            order: OrderResponse::from(&receipt.order),
            checkout_state: receipt.state,
        }
    }
}

// -- Handlers --

/// Loads an order the caller may see. Other customers' orders read as missing.
pub(crate) async fn visible_order<S: EventStore + Clone + 'static>(
    state: &AppState<S>,
    principal: &Principal,
    id: &AggregateId,
) -> Result<Order, ApiError> {
    state
        .orders()
        .get_order(id)
        .await?
        .filter(|order| principal.is_admin() || order.is_owned_by(&principal.account_id))
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))
}

/// POST /orders checks out the caller's cart.
#[tracing::instrument(skip(state, user, req), fields(customer = %user.0.account_id))]
pub async fn place<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    ApiJson(req): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let CurrentUser(principal) = user;
    let mut request =
        CheckoutRequest::new(principal.account_id, req.payment_method, req.billing_address);
    if let Some(address) = req.shipping_address {
        request = request.with_shipping_address(address);
    }
    if let Some(method) = req.shipping_method {
        request = request.with_shipping_method(method);
    }
    if let Some(notes) = req.notes {
        request = request.with_notes(notes);
    }

    let receipt = state.checkout.checkout(request).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// GET /orders lists the caller's orders from the read model.
#[tracing::instrument(skip(state, user))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    state.projections.run_catch_up().await?;
    Ok(Json(state.summaries.for_customer(&user.0.account_id).await))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state, user))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = visible_order(&state, &user.0, &AggregateId::from(id)).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PUT /orders/{id}/cancel cancels a pending or confirmed order and
/// gives its stock back.
#[tracing::instrument(skip(state, user, req))]
pub async fn cancel<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CancelRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let CurrentUser(principal) = user;
    let id = AggregateId::from(id);
    visible_order(&state, &principal, &id).await?;

    let reason = req
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "Cancelled by customer".to_string());
    let order = state
        .checkout
        .cancel_order(&id, reason, principal.account_id.as_str())
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}
