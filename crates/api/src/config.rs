//! Application configuration loaded from environment variables.

use std::str::FromStr;

use domain::cart::DEFAULT_RETENTION_DAYS;
use domain::{Money, PricingConfig, ShippingRates};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Deployment environment. Only development responses carry error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` bind address (default: `"0.0.0.0"`)
/// - `PORT` listen port (default: `3000`)
/// - `RUST_LOG` tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` `json` for structured output, anything else for pretty
/// - `APP_ENV` `development` exposes error details (default: production)
/// - `DATABASE_URL` PostgreSQL connection; in-memory stores when unset
/// - `CART_RETENTION_DAYS` idle days before a cart is reset (default: 30)
/// - `TAX_RATE_BPS` tax in basis points (default: 800)
/// - `SHIPPING_STANDARD_CENTS`, `SHIPPING_EXPRESS_CENTS`,
///   `SHIPPING_OVERNIGHT_CENTS` flat shipping rates
/// - `ADMIN_TOKEN` session token granted the administrator role
/// - `DEMO_SEED` `true` seeds demo products, a coupon and a customer
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub environment: Environment,
    pub database_url: Option<String>,
    pub cart_retention_days: i64,
    pub pricing: PricingConfig,
    pub admin_token: Option<String>,
    pub demo_seed: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let cents = |key: &str, default: Money| {
            parse_var(&lookup, key).map(Money::from_cents).unwrap_or(default)
        };

        let pricing = PricingConfig {
            tax_rate_bps: parse_var(&lookup, "TAX_RATE_BPS")
                .unwrap_or(defaults.pricing.tax_rate_bps),
            shipping: ShippingRates {
                standard: cents("SHIPPING_STANDARD_CENTS", defaults.pricing.shipping.standard),
                express: cents("SHIPPING_EXPRESS_CENTS", defaults.pricing.shipping.express),
                overnight: cents(
                    "SHIPPING_OVERNIGHT_CENTS",
                    defaults.pricing.shipping.overnight,
                ),
            },
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            environment: match lookup("APP_ENV").as_deref() {
                Some(e) if e.eq_ignore_ascii_case("development") => Environment::Development,
                _ => Environment::Production,
            },
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            cart_retention_days: parse_var(&lookup, "CART_RETENTION_DAYS")
                .filter(|days: &i64| *days > 0)
                .unwrap_or(defaults.cart_retention_days),
            pricing,
            admin_token: lookup("ADMIN_TOKEN").filter(|t| !t.trim().is_empty()),
            demo_seed: lookup("DEMO_SEED")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn cart_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.cart_retention_days)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            environment: Environment::Production,
            database_url: None,
            cart_retention_days: DEFAULT_RETENTION_DAYS,
            pricing: PricingConfig::default(),
            admin_token: None,
            demo_seed: false,
        }
    }
}
