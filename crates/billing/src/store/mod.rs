//! Persistence for customers and subscriptions
//!
//! A store value is one unit of work. Writes made with `auto_commit = false`
//! stay pending until [`BillingStore::commit`]; reads through the same store
//! see them.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::BillingResult;
use crate::filter::{CustomerFilter, Page, SubscriptionFilter};
use crate::models::{Customer, Subscription};

#[async_trait]
pub trait BillingStore: Send {
    /// First customer matching `filter`, newest first.
    async fn fetch_customer(&mut self, filter: &CustomerFilter) -> BillingResult<Option<Customer>>;

    /// Subscriptions matching `filter`, ordered by `created_at` descending.
    async fn fetch_subscriptions(
        &mut self,
        filter: &SubscriptionFilter,
        page: Page,
    ) -> BillingResult<Vec<Subscription>>;

    /// Insert or update by `id`.
    async fn save_customer(&mut self, customer: &Customer, auto_commit: bool) -> BillingResult<()>;

    /// Insert or update by `id`.
    async fn save_subscription(
        &mut self,
        subscription: &Subscription,
        auto_commit: bool,
    ) -> BillingResult<()>;

    /// Delete subscriptions by `id`, returning how many rows went away.
    async fn delete_subscriptions(&mut self, ids: &[Uuid], auto_commit: bool)
        -> BillingResult<u64>;

    async fn commit(&mut self) -> BillingResult<()>;

    async fn rollback(&mut self) -> BillingResult<()>;
}
