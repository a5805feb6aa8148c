//! Test doubles shared by the unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::filter::{CustomerFilter, Page, SubscriptionFilter};
use crate::models::{Customer, Subscription};
use crate::provider::{NewCustomer, PaymentProvider, ProviderCustomer, ProviderPrice};
use crate::store::{BillingStore, MemoryStore};

pub fn price(id: &str) -> ProviderPrice {
    ProviderPrice {
        id: id.to_string(),
        product_id: Some("prod_test".to_string()),
        unit_amount: Some(2900),
        currency: Some("usd".to_string()),
        active: true,
    }
}

/// Records every call and hands out sequential customer ids
#[derive(Default)]
pub struct MockProvider {
    price_calls: AtomicUsize,
    customer_calls: AtomicUsize,
    fail_prices: AtomicBool,
    fail_customers: AtomicBool,
    created: Mutex<Vec<(Option<String>, Option<String>, Option<String>)>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn customer_calls(&self) -> usize {
        self.customer_calls.load(Ordering::SeqCst)
    }

    pub fn fail_prices(&self, fail: bool) {
        self.fail_prices.store(fail, Ordering::SeqCst);
    }

    pub fn fail_customers(&self, fail: bool) {
        self.fail_customers.store(fail, Ordering::SeqCst);
    }

    /// (name, email, user_id metadata) for each created customer
    pub fn created_customers(&self) -> Vec<(Option<String>, Option<String>, Option<String>)> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn retrieve_price(&self, price_id: &str) -> BillingResult<ProviderPrice> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_prices.load(Ordering::SeqCst) {
            return Err(BillingError::Provider("price lookup failed".to_string()));
        }
        Ok(price(price_id))
    }

    async fn create_customer(&self, params: NewCustomer<'_>) -> BillingResult<ProviderCustomer> {
        let call = self.customer_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_customers.load(Ordering::SeqCst) {
            return Err(BillingError::Provider("customer creation failed".to_string()));
        }
        self.created.lock().unwrap().push((
            params.name.map(str::to_string),
            params.email.map(str::to_string),
            params.metadata.get("user_id").cloned(),
        ));
        Ok(ProviderCustomer {
            id: format!("cus_mock_{}", call),
        })
    }
}

fn store_failure() -> BillingError {
    BillingError::Database(sqlx::Error::PoolTimedOut)
}

/// `MemoryStore` that fails selected writes with a database error
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_customer_saves: bool,
    /// Number of subscription saves allowed before every later one fails
    subscription_saves_allowed: Option<usize>,
    subscription_saves: usize,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn fail_customer_saves(mut self) -> Self {
        self.fail_customer_saves = true;
        self
    }

    pub fn fail_subscription_saves_after(mut self, allowed: usize) -> Self {
        self.subscription_saves_allowed = Some(allowed);
        self
    }
}

#[async_trait]
impl BillingStore for FailingStore {
    async fn fetch_customer(&mut self, filter: &CustomerFilter) -> BillingResult<Option<Customer>> {
        self.inner.fetch_customer(filter).await
    }

    async fn fetch_subscriptions(
        &mut self,
        filter: &SubscriptionFilter,
        page: Page,
    ) -> BillingResult<Vec<Subscription>> {
        self.inner.fetch_subscriptions(filter, page).await
    }

    async fn save_customer(&mut self, customer: &Customer, auto_commit: bool) -> BillingResult<()> {
        if self.fail_customer_saves {
            return Err(store_failure());
        }
        self.inner.save_customer(customer, auto_commit).await
    }

    async fn save_subscription(
        &mut self,
        subscription: &Subscription,
        auto_commit: bool,
    ) -> BillingResult<()> {
        if let Some(allowed) = self.subscription_saves_allowed {
            if self.subscription_saves >= allowed {
                return Err(store_failure());
            }
        }
        self.subscription_saves += 1;
        self.inner.save_subscription(subscription, auto_commit).await
    }

    async fn delete_subscriptions(&mut self, ids: &[Uuid], auto_commit: bool) -> BillingResult<u64> {
        self.inner.delete_subscriptions(ids, auto_commit).await
    }

    async fn commit(&mut self) -> BillingResult<()> {
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> BillingResult<()> {
        self.inner.rollback().await
    }
}
