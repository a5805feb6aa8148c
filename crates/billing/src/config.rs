//! Environment configuration

use std::str::FromStr;
use std::time::Duration;

use crate::error::{BillingError, BillingResult};

const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
const DEFAULT_PRICE_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_PRICE_CACHE_CAPACITY: usize = 100;

/// Stripe credentials and webhook settings
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    /// Maximum age of a signed webhook before it is rejected
    pub webhook_tolerance: Duration,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[redacted]")
            .field("webhook_secret", &"[redacted]")
            .field("webhook_tolerance", &self.webhook_tolerance)
            .finish()
    }
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            webhook_secret: webhook_secret.into(),
            webhook_tolerance: Duration::from_secs(DEFAULT_WEBHOOK_TOLERANCE_SECS),
        }
    }

    /// Load from `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET` and
    /// `STRIPE_WEBHOOK_TOLERANCE_SECS`. A `.env` file is read when present.
    pub fn from_env() -> BillingResult<Self> {
        dotenvy::dotenv().ok();

        let secret_key = required_var("STRIPE_SECRET_KEY")?;
        let webhook_secret = required_var("STRIPE_WEBHOOK_SECRET")?;
        let tolerance_secs =
            parse_var("STRIPE_WEBHOOK_TOLERANCE_SECS", DEFAULT_WEBHOOK_TOLERANCE_SECS)?;

        Ok(Self {
            secret_key,
            webhook_secret,
            webhook_tolerance: Duration::from_secs(tolerance_secs),
        })
    }
}

/// Sizing of the price lookup cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceCacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl Default for PriceCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_PRICE_CACHE_TTL_SECS),
            capacity: DEFAULT_PRICE_CACHE_CAPACITY,
        }
    }
}

impl PriceCacheConfig {
    /// Load from `PRICE_CACHE_TTL_SECS` and `PRICE_CACHE_CAPACITY`, falling back to defaults.
    pub fn from_env() -> BillingResult<Self> {
        dotenvy::dotenv().ok();

        let ttl_secs = parse_var("PRICE_CACHE_TTL_SECS", DEFAULT_PRICE_CACHE_TTL_SECS)?;
        let capacity = parse_var("PRICE_CACHE_CAPACITY", DEFAULT_PRICE_CACHE_CAPACITY)?;
        if capacity == 0 {
            return Err(BillingError::Config(
                "PRICE_CACHE_CAPACITY must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            ttl: Duration::from_secs(ttl_secs),
            capacity,
        })
    }
}

fn required_var(name: &str) -> BillingResult<String> {
    std::env::var(name).map_err(|_| BillingError::Config(format!("{} must be set", name)))
}

fn parse_var<T: FromStr>(name: &str, default: T) -> BillingResult<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| BillingError::Config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
