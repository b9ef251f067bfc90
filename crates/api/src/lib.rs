//! HTTP API for the marketplace: carts, checkout and order management.
//!
//! Structured logging (tracing), Prometheus metrics and one [`ApiError`]
//! mapping every failure to a JSON body.

pub mod config;
pub mod demo;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::ApiError;
pub use state::{AppState, Collaborators};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    config: &Config,
) -> Router {
    error::expose_details(config.is_development());

    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health::<S>))
        .route("/cart/{key}", get(routes::carts::get::<S>))
        .route("/cart/{key}/add", post(routes::carts::add_item::<S>))
        .route(
            "/cart/{key}/update/{item_id}",
            put(routes::carts::update_item::<S>),
        )
        .route(
            "/cart/{key}/remove/{item_id}",
            delete(routes::carts::remove_item::<S>),
        )
        .route("/cart/{key}/clear", delete(routes::carts::clear::<S>))
        .route(
            "/cart/{key}/apply-coupon",
            post(routes::carts::apply_coupon::<S>),
        )
        .route("/cart/{key}/coupon", delete(routes::carts::remove_coupon::<S>))
        .route(
            "/cart/{key}/shipping-method",
            put(routes::carts::set_shipping_method::<S>),
        )
        .route(
            "/cart/{key}/shipping-address",
            put(routes::carts::set_shipping_address::<S>),
        )
        .route(
            "/orders",
            post(routes::orders::place::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/admin", get(routes::admin::list::<S>))
        .route(
            "/orders/admin/checkout/resume-stalled",
            post(routes::admin::resume_stalled::<S>),
        )
        .route(
            "/orders/admin/{id}/status",
            put(routes::admin::update_status::<S>),
        )
        .route("/orders/admin/{id}/refund", post(routes::admin::refund::<S>))
        .route(
            "/orders/admin/{id}/checkout",
            get(routes::admin::checkout_log::<S>),
        )
        .route(
            "/orders/admin/{id}/checkout/resume",
            post(routes::admin::resume_checkout::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", put(routes::orders::cancel::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over a store with in-process collaborators.
///
/// Returns the in-memory catalog, coupon book and account directory too,
/// so callers can seed them.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    store: S,
    sequences: Arc<dyn event_store::SequenceAllocator>,
    config: &Config,
) -> (Arc<AppState<S>>, demo::InMemoryCollaborators) {
    let in_memory = demo::InMemoryCollaborators::default();
    let state = AppState::new(store, in_memory.collaborators(sequences), config);
    (Arc::new(state), in_memory)
}
