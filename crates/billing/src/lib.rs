// Billing crate clippy configuration
#![allow(clippy::result_large_err)] // BillingError wraps StripeError
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! BillSync Billing Module
//!
//! Keeps local customer and subscription rows in sync with Stripe.
//!
//! ## Features
//!
//! - **Customers**: Create Stripe customers and link them to local users
//! - **Subscriptions**: Mirror Stripe subscription items into local rows
//! - **Prices**: Cached price lookups
//! - **Webhooks**: Verify Stripe signatures and apply subscription events
//! - **Persistence**: PostgreSQL store plus an in-memory store for tests

pub mod client;
pub mod config;
pub mod customer;
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod prices;
pub mod provider;
pub mod store;
pub mod subscriptions;
pub mod webhooks;

#[cfg(test)]
mod test_support;

// Client
pub use client::StripeClient;

// Config
pub use config::{PriceCacheConfig, StripeConfig};

// Customer
pub use customer::CustomerService;

// Error
pub use error::{BillingError, BillingResult};

// Filters
pub use filter::{CustomerFilter, Filter, Page, SubscriptionFilter};

// Models
pub use models::{Customer, PeriodEnd, Subscription};

// Prices
pub use prices::{PriceCache, PriceService};

// Provider
pub use provider::{
    NewCustomer, ObjectRef, PaymentProvider, ProviderCustomer, ProviderPrice,
    ProviderSubscription, ProviderSubscriptionItem,
};

// Store
pub use store::{BillingStore, MemoryStore, PgStore};

// Subscriptions
pub use subscriptions::SubscriptionService;

// Webhooks
pub use webhooks::{WebhookEvent, WebhookHandler, WebhookOutcome};

use std::sync::Arc;

use uuid::Uuid;

/// Main billing service that combines all billing functionality
pub struct BillingService {
    pub prices: PriceService,
    pub customers: CustomerService,
    pub subscriptions: SubscriptionService,
}

impl BillingService {
    /// Create a new billing service over any payment provider
    pub fn new(provider: Arc<dyn PaymentProvider>, cache: PriceCacheConfig) -> Self {
        Self {
            prices: PriceService::new(provider.clone(), cache),
            customers: CustomerService::new(provider),
            subscriptions: SubscriptionService::new(),
        }
    }

    /// Create a new billing service backed by Stripe, from environment variables
    pub fn from_env() -> BillingResult<Self> {
        let stripe = StripeClient::from_env()?;
        let cache = PriceCacheConfig::from_env()?;
        Ok(Self::new(Arc::new(stripe), cache))
    }

    pub async fn fetch_price(&self, price_id: &str) -> BillingResult<ProviderPrice> {
        self.prices.fetch_price(price_id).await
    }

    pub async fn find_customer<S>(
        &self,
        db: &mut S,
        filter: &CustomerFilter,
    ) -> BillingResult<Option<Customer>>
    where
        S: BillingStore + ?Sized,
    {
        self.customers.find_customer(db, filter).await
    }

    pub async fn create_customer<S>(
        &self,
        db: &mut S,
        user_id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> BillingResult<Customer>
    where
        S: BillingStore + ?Sized,
    {
        self.customers.create_customer(db, user_id, name, email).await
    }

    pub async fn ensure_customer<S>(
        &self,
        db: &mut S,
        user_id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> BillingResult<Customer>
    where
        S: BillingStore + ?Sized,
    {
        self.customers.ensure_customer(db, user_id, name, email).await
    }

    pub async fn list_subscriptions<S>(
        &self,
        db: &mut S,
        filter: &SubscriptionFilter,
        offset: i64,
        limit: Option<i64>,
    ) -> BillingResult<Vec<Subscription>>
    where
        S: BillingStore + ?Sized,
    {
        self.subscriptions
            .list_subscriptions(db, filter, offset, limit)
            .await
    }

    pub async fn find_subscription<S>(
        &self,
        db: &mut S,
        filter: &SubscriptionFilter,
    ) -> BillingResult<Option<Subscription>>
    where
        S: BillingStore + ?Sized,
    {
        self.subscriptions.find_subscription(db, filter).await
    }

    pub async fn create_or_update_subscription<S>(
        &self,
        db: &mut S,
        item_id: &str,
        product_id: &str,
        customer_id: Uuid,
        current_period_end: impl Into<PeriodEnd>,
        auto_commit: bool,
    ) -> BillingResult<Subscription>
    where
        S: BillingStore + ?Sized,
    {
        self.subscriptions
            .create_or_update_subscription(
                db,
                item_id,
                product_id,
                customer_id,
                current_period_end,
                auto_commit,
            )
            .await
    }

    pub async fn sync_subscriptions_from_provider<S>(
        &self,
        db: &mut S,
        provider_subscription: &ProviderSubscription,
    ) -> BillingResult<Vec<Subscription>>
    where
        S: BillingStore + ?Sized,
    {
        self.subscriptions
            .sync_subscriptions_from_provider(db, provider_subscription)
            .await
    }

    pub async fn delete_subscriptions_from_provider<S>(
        &self,
        db: &mut S,
        provider_subscription: &ProviderSubscription,
    ) -> BillingResult<u64>
    where
        S: BillingStore + ?Sized,
    {
        self.subscriptions
            .delete_subscriptions_from_provider(db, provider_subscription)
            .await
    }
}
