//! API error types with HTTP response mapping.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::{CartError, CatalogError, DomainError, IdentityError, OrderError};
use event_store::EventStoreError;
use projections::ProjectionError;

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Turns the `detail` field of error bodies on or off.
pub fn expose_details(enabled: bool) {
    EXPOSE_DETAILS.store(enabled, Ordering::Relaxed);
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// A request field failed validation.
    Validation {
        field: &'static str,
        message: String,
    },
    /// Bad request from the client.
    BadRequest(String),
    /// No usable session token.
    Unauthorized,
    /// Authenticated, but not allowed.
    Forbidden,
    /// Resource not found.
    NotFound(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Checkout orchestration error.
    Checkout(CheckoutError),
    /// Read model failed to catch up.
    Projection(ProjectionError),
}

/// Status code and, for validation failures, the offending field.
struct Classified {
    status: StatusCode,
    field: Option<&'static str>,
}

impl Classified {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            field: None,
        }
    }

    fn field(status: StatusCode, field: &'static str) -> Self {
        Self {
            status,
            field: Some(field),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (classified, message, detail) = match &self {
            ApiError::Validation { field, message } => (
                Classified::field(StatusCode::BAD_REQUEST, *field),
                message.clone(),
                None,
            ),
            ApiError::BadRequest(msg) => {
                (Classified::new(StatusCode::BAD_REQUEST), msg.clone(), None)
            }
            ApiError::Unauthorized => (
                Classified::new(StatusCode::UNAUTHORIZED),
                "Authentication required".to_string(),
                None,
            ),
            ApiError::Forbidden => (
                Classified::new(StatusCode::FORBIDDEN),
                "Administrator access required".to_string(),
                None,
            ),
            ApiError::NotFound(msg) => (Classified::new(StatusCode::NOT_FOUND), msg.clone(), None),
            ApiError::Domain(err) => (
                classify_domain(err),
                err.to_string(),
                Some(format!("{err:?}")),
            ),
            ApiError::Checkout(err) => (
                classify_checkout(err),
                err.to_string(),
                Some(format!("{err:?}")),
            ),
            ApiError::Projection(err) => (
                Classified::new(StatusCode::INTERNAL_SERVER_ERROR),
                err.to_string(),
                Some(format!("{err:?}")),
            ),
        };

        let message = if classified.status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
            "Internal server error".to_string()
        } else {
            message
        };

        let mut body = serde_json::json!({ "error": message });
        if let Some(field) = classified.field {
            body["field"] = field.into();
        }
        if let Some(detail) = detail.filter(|_| EXPOSE_DETAILS.load(Ordering::Relaxed)) {
            body["detail"] = detail.into();
        }

        (classified.status, axum::Json(body)).into_response()
    }
}

fn classify_domain(err: &DomainError) -> Classified {
    match err {
        DomainError::Cart(e) => classify_cart(e),
        DomainError::Order(e) => classify_order(e),
        DomainError::Catalog(e) => classify_catalog(e),
        DomainError::AggregateNotFound { .. } => Classified::new(StatusCode::NOT_FOUND),
        DomainError::EventStore(e) => classify_store(e),
        DomainError::Serialization(_) => Classified::new(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

fn classify_cart(err: &CartError) -> Classified {
    match err {
        CartError::MalformedKey(_) => Classified::field(StatusCode::BAD_REQUEST, "key"),
        CartError::InvalidQuantity(_) => Classified::field(StatusCode::BAD_REQUEST, "quantity"),
        CartError::VariantNotFound { .. } => Classified::field(StatusCode::BAD_REQUEST, "variant"),
        CartError::InvalidCoupon(_) => Classified::field(StatusCode::BAD_REQUEST, "code"),
        CartError::InvalidAddress(e) => Classified::field(StatusCode::BAD_REQUEST, e.field),
        CartError::ProductUnavailable(_) | CartError::InsufficientStock { .. } => {
            Classified::new(StatusCode::BAD_REQUEST)
        }
        CartError::ItemNotFound(_) | CartError::CartNotFound | CartError::ProductNotFound(_) => {
            Classified::new(StatusCode::NOT_FOUND)
        }
        CartError::AlreadyCreated => Classified::new(StatusCode::CONFLICT),
    }
}

fn classify_order(err: &OrderError) -> Classified {
    match err {
        OrderError::NotFound => Classified::new(StatusCode::NOT_FOUND),
        OrderError::AlreadyPlaced => Classified::new(StatusCode::CONFLICT),
        OrderError::NoItems | OrderError::InvalidStateTransition { .. } => {
            Classified::new(StatusCode::BAD_REQUEST)
        }
        OrderError::InvalidRefundAmount(_) | OrderError::RefundExceedsTotal { .. } => {
            Classified::field(StatusCode::BAD_REQUEST, "amount")
        }
    }
}

fn classify_catalog(err: &CatalogError) -> Classified {
    match err {
        CatalogError::ProductNotFound(_) => Classified::new(StatusCode::NOT_FOUND),
        CatalogError::InsufficientStock { .. } => Classified::new(StatusCode::BAD_REQUEST),
        CatalogError::Unavailable(_) => Classified::new(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

fn classify_store(err: &EventStoreError) -> Classified {
    if err.is_conflict() {
        Classified::new(StatusCode::CONFLICT)
    } else {
        Classified::new(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn classify_checkout(err: &CheckoutError) -> Classified {
    match err {
        CheckoutError::EmptyCart
        | CheckoutError::InsufficientStock { .. }
        | CheckoutError::ProductUnavailable(_) => Classified::new(StatusCode::BAD_REQUEST),
        CheckoutError::InvalidAddress(e) => Classified::field(StatusCode::BAD_REQUEST, e.field),
        CheckoutError::NotFound(_) => Classified::new(StatusCode::NOT_FOUND),
        CheckoutError::NotResumable { .. } => Classified::new(StatusCode::CONFLICT),
        CheckoutError::NotStarted | CheckoutError::Serialization(_) => {
            Classified::new(StatusCode::INTERNAL_SERVER_ERROR)
        }
        CheckoutError::Catalog(e) => classify_catalog(e),
        CheckoutError::Domain(e) => classify_domain(e),
        CheckoutError::EventStore(e) => classify_store(e),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Projection(err)
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::Validation {
            field: "key",
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
