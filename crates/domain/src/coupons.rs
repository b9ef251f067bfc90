//! Coupon book collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::catalog::CatalogError;
use crate::pricing::{Coupon, CouponDiscount};

/// A coupon as issued by the marketing side, with its redemption window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponDefinition {
    pub code: String,
    pub discount: CouponDiscount,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CouponDefinition {
    /// Creates an active coupon with no expiry.
    pub fn new(code: impl Into<String>, discount: CouponDiscount) -> Self {
        Self {
            code: normalize_code(&code.into()),
            discount,
            active: true,
            expires_at: None,
        }
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns the coupon if it can be redeemed at `now`.
    pub fn redeemable_at(&self, now: DateTime<Utc>) -> Option<Coupon> {
        let expired = self.expires_at.is_some_and(|at| at <= now);
        (self.active && !expired).then(|| Coupon::new(self.code.clone(), self.discount))
    }
}

/// Coupon codes are matched case-insensitively.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Lookup of coupon definitions by code.
#[async_trait]
pub trait CouponBook: Send + Sync {
    async fn find(&self, code: &str) -> Result<Option<CouponDefinition>, CatalogError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCouponBook {
    coupons: Arc<RwLock<HashMap<String, CouponDefinition>>>,
}

impl InMemoryCouponBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, coupon: CouponDefinition) {
        self.coupons
            .write()
            .await
            .insert(coupon.code.clone(), coupon);
    }
}

#[async_trait]
impl CouponBook for InMemoryCouponBook {
    async fn find(&self, code: &str) -> Result<Option<CouponDefinition>, CatalogError> {
        Ok(self.coupons.read().await.get(&normalize_code(code)).cloned())
    }
}
