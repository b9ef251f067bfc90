//! Administrator order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use checkout::{CheckoutLog, ResumeReport};
use common::AggregateId;
use domain::order::{IssueRefund, TransitionOrder};
use domain::{Money, OrderStatus, RefundMethod};
use event_store::EventStore;
use projections::OrderSummary;
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson};
use crate::routes::orders::{CheckoutResponse, OrderResponse};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    pub message: Option<String>,
    pub tracking_number: Option<String>,
}

#[derive(Deserialize)]
pub struct RefundRequest {
    /// Amount in cents.
    pub amount: Money,
    pub reason: String,
    #[serde(default)]
    pub method: RefundMethod,
}

fn parse_status(raw: &str) -> Result<OrderStatus, ApiError> {
    raw.parse()
        .map_err(|message| ApiError::Validation {
            field: "status",
            message,
        })
}

// -- Handlers --

/// GET /orders/admin lists every order, optionally narrowed by `status`.
#[tracing::instrument(skip(state, _admin, query))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    state.projections.run_catch_up().await?;
    Ok(Json(state.summaries.all(status).await))
}

/// PUT /orders/admin/{id}/status
///
/// Cancellation goes through checkout so committed stock is restored.
#[tracing::instrument(skip(state, admin, req))]
pub async fn update_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusUpdateRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let AdminUser(principal) = admin;
    let id = AggregateId::from(id);
    let status = parse_status(&req.status)?;
    let actor = principal.account_id.as_str();

    let order = if status == OrderStatus::Cancelled {
        let reason = req
            .message
            .unwrap_or_else(|| "Cancelled by administrator".to_string());
        state.checkout.cancel_order(&id, reason, actor).await?
    } else {
        let mut cmd = TransitionOrder::new(id, status, actor);
        if let Some(message) = req.message {
            cmd = cmd.with_message(message);
        }
        if let Some(tracking_number) = req.tracking_number {
            cmd = cmd.with_tracking_number(tracking_number);
        }
        state.orders().transition(cmd).await?.aggregate
    };

    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/admin/{id}/refund
#[tracing::instrument(skip(state, _admin, req))]
pub async fn refund<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RefundRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let cmd = IssueRefund::new(AggregateId::from(id), req.amount, req.reason).via(req.method);
    let result = state.orders().refund(cmd).await?;
    Ok(Json(OrderResponse::from(&result.aggregate)))
}

/// GET /orders/admin/{id}/checkout returns the checkout log.
#[tracing::instrument(skip(state, _admin))]
pub async fn checkout_log<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<CheckoutLog>, ApiError> {
    let id = AggregateId::from(id);
    state
        .checkout
        .checkout_log(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No checkout recorded for order {id}")))
}

/// POST /orders/admin/{id}/checkout/resume
#[tracing::instrument(skip(state, _admin))]
pub async fn resume_checkout<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let receipt = state.checkout.resume(&AggregateId::from(id)).await?;
    Ok(Json(receipt.into()))
}

/// POST /orders/admin/checkout/resume-stalled retries every stalled checkout.
#[tracing::instrument(skip(state, _admin))]
pub async fn resume_stalled<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AdminUser,
) -> Result<Json<ResumeReport>, ApiError> {
    Ok(Json(state.checkout.resume_stalled().await?))
}
