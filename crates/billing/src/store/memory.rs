//! In-process store for tests and local development

use async_trait::async_trait;
use uuid::Uuid;

use super::BillingStore;
use crate::error::BillingResult;
use crate::filter::{CustomerFilter, Page, SubscriptionFilter};
use crate::models::{Customer, Subscription};

#[derive(Debug, Clone, Default)]
struct Tables {
    customers: Vec<Customer>,
    subscriptions: Vec<Subscription>,
}

/// Keeps a committed snapshot and a working copy; `rollback` restores the snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    committed: Tables,
    working: Tables,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed customers in insertion order
    pub fn customers(&self) -> &[Customer] {
        &self.committed.customers
    }

    /// Committed subscriptions in insertion order
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.committed.subscriptions
    }

    pub fn has_pending_changes(&self) -> bool {
        self.committed.customers != self.working.customers
            || self.committed.subscriptions != self.working.subscriptions
    }

    fn commit_if(&mut self, auto_commit: bool) {
        if auto_commit {
            self.committed = self.working.clone();
        }
    }

    fn customer_user_id(&self, customer_id: Uuid) -> Option<&String> {
        self.working
            .customers
            .iter()
            .find(|c| c.id == customer_id)
            .map(|c| &c.user_id)
    }
}

fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> time::OffsetDateTime) -> Vec<T> {
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    sorted
}

fn paginate<T>(rows: Vec<T>, page: Page) -> Vec<T> {
    let skip = usize::try_from(page.offset).unwrap_or(0);
    let take = page
        .limit
        .map(|limit| usize::try_from(limit).unwrap_or(0))
        .unwrap_or(usize::MAX);
    rows.into_iter().skip(skip).take(take).collect()
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn fetch_customer(&mut self, filter: &CustomerFilter) -> BillingResult<Option<Customer>> {
        Ok(newest_first(&self.working.customers, |c| c.created_at)
            .into_iter()
            .find(|c| {
                filter.user_id.matches(Some(&c.user_id))
                    && filter.stripe_customer_id.matches(Some(&c.stripe_customer_id))
            }))
    }

    async fn fetch_subscriptions(
        &mut self,
        filter: &SubscriptionFilter,
        page: Page,
    ) -> BillingResult<Vec<Subscription>> {
        let matching: Vec<Subscription> =
            newest_first(&self.working.subscriptions, |s| s.created_at)
                .into_iter()
                .filter(|s| {
                    filter.user_id.matches(self.customer_user_id(s.customer_id))
                        && filter
                            .stripe_subscription_item_id
                            .matches(Some(&s.stripe_subscription_item_id))
                        && filter.stripe_product_id.matches(Some(&s.stripe_product_id))
                })
                .collect();
        Ok(paginate(matching, page))
    }

    async fn save_customer(&mut self, customer: &Customer, auto_commit: bool) -> BillingResult<()> {
        match self.working.customers.iter_mut().find(|c| c.id == customer.id) {
            Some(existing) => *existing = customer.clone(),
            None => self.working.customers.push(customer.clone()),
        }
        self.commit_if(auto_commit);
        Ok(())
    }

    async fn save_subscription(
        &mut self,
        subscription: &Subscription,
        auto_commit: bool,
    ) -> BillingResult<()> {
        match self
            .working
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
        {
            Some(existing) => *existing = subscription.clone(),
            None => self.working.subscriptions.push(subscription.clone()),
        }
        self.commit_if(auto_commit);
        Ok(())
    }

    async fn delete_subscriptions(
        &mut self,
        ids: &[Uuid],
        auto_commit: bool,
    ) -> BillingResult<u64> {
        let before = self.working.subscriptions.len();
        self.working.subscriptions.retain(|s| !ids.contains(&s.id));
        let removed = (before - self.working.subscriptions.len()) as u64;
        self.commit_if(auto_commit);
        Ok(removed)
    }

    async fn commit(&mut self) -> BillingResult<()> {
        self.commit_if(true);
        Ok(())
    }

    async fn rollback(&mut self) -> BillingResult<()> {
        self.working = self.committed.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[tokio::test]
    async fn test_pending_writes_visible_until_rollback() {
        let mut store = MemoryStore::new();
        let customer = Customer::new("user_1", "cus_1");

        store.save_customer(&customer, false).await.unwrap();
        assert!(store.has_pending_changes());
        assert!(store.customers().is_empty());
        let found = store
            .fetch_customer(&CustomerFilter::default().user_id("user_1"))
            .await
            .unwrap();
        assert_eq!(found, Some(customer));

        store.rollback().await.unwrap();
        let found = store.fetch_customer(&CustomerFilter::default()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_negative_page_values_count_as_zero() {
        let mut store = MemoryStore::new();
        let customer = Customer::new("user_1", "cus_1");
        store.save_customer(&customer, true).await.unwrap();
        let sub = Subscription::new(customer.id, "si_1", "prod_1", datetime!(2030-01-01 0:00 UTC));
        store.save_subscription(&sub, true).await.unwrap();

        let negative_limit = Page {
            offset: 0,
            limit: Some(-1),
        };
        let negative_offset = Page {
            offset: -4,
            limit: None,
        };
        assert!(store
            .fetch_subscriptions(&SubscriptionFilter::default(), negative_limit)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .fetch_subscriptions(&SubscriptionFilter::default(), negative_offset)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_pagination_over_newest_first() {
        let mut store = MemoryStore::new();
        let customer = Customer::new("user_1", "cus_1");
        store.save_customer(&customer, true).await.unwrap();

        for (index, day) in [1u8, 2, 3].into_iter().enumerate() {
            let mut sub = Subscription::new(
                customer.id,
                format!("si_{}", index),
                "prod_1",
                datetime!(2030-01-01 0:00 UTC),
            );
            sub.created_at = datetime!(2024-01-01 0:00 UTC).replace_day(day).unwrap();
            store.save_subscription(&sub, true).await.unwrap();
        }

        let page = store
            .fetch_subscriptions(&SubscriptionFilter::default(), Page::new(1, Some(1)))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].stripe_subscription_item_id, "si_1");

        let all = store
            .fetch_subscriptions(&SubscriptionFilter::default(), Page::all())
            .await
            .unwrap();
        let order: Vec<&str> = all
            .iter()
            .map(|s| s.stripe_subscription_item_id.as_str())
            .collect();
        assert_eq!(order, vec!["si_2", "si_1", "si_0"]);
    }
}
