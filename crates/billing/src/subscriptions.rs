//! Subscription management
//!
//! Local subscriptions mirror Stripe subscription items one to one, keyed by
//! the item id.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::BillingResult;
use crate::filter::{CustomerFilter, Page, SubscriptionFilter};
use crate::models::{PeriodEnd, Subscription};
use crate::provider::ProviderSubscription;
use crate::store::BillingStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionService;

impl SubscriptionService {
    pub fn new() -> Self {
        Self
    }

    /// One page of subscriptions, newest first. `limit = None` returns every row after `offset`.
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
        db.fetch_subscriptions(filter, Page::new(offset, limit))
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
        let mut page = db.fetch_subscriptions(filter, Page::first()).await?;
        Ok(page.pop())
    }

    /// Insert or update the subscription for `item_id`.
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
        let current_period_end = current_period_end.into().to_datetime()?;

        let existing = self
            .find_subscription(
                db,
                &SubscriptionFilter::default().stripe_subscription_item_id(item_id),
            )
            .await?;

        let subscription = match existing {
            Some(mut subscription) => {
                subscription.customer_id = customer_id;
                subscription.stripe_product_id = product_id.to_string();
                subscription.current_period_end = current_period_end;
                subscription.updated_at = OffsetDateTime::now_utc();
                subscription
            }
            None => Subscription::new(customer_id, item_id, product_id, current_period_end),
        };

        db.save_subscription(&subscription, auto_commit).await?;

        tracing::debug!(
            subscription_id = %subscription.id,
            stripe_subscription_item_id = %item_id,
            stripe_product_id = %product_id,
            "Saved subscription"
        );

        Ok(subscription)
    }

    /// Mirror every item of a Stripe subscription into local rows.
    ///
    /// Returns nothing, without error, when the Stripe customer has no local
    /// customer. All items are committed together; if any item fails, the
    /// store is rolled back and nothing from the batch is kept.
    pub async fn sync_subscriptions_from_provider<S>(
        &self,
        db: &mut S,
        provider_subscription: &ProviderSubscription,
    ) -> BillingResult<Vec<Subscription>>
    where
        S: BillingStore + ?Sized,
    {
        let stripe_customer_id = provider_subscription.customer_id();
        let Some(customer) = db
            .fetch_customer(&CustomerFilter::default().stripe_customer_id(stripe_customer_id))
            .await?
        else {
            tracing::info!(
                stripe_subscription_id = %provider_subscription.id,
                stripe_customer_id = %stripe_customer_id,
                "No local customer for Stripe subscription, skipping sync"
            );
            return Ok(Vec::new());
        };

        // Resolve every period end before the first write
        let items = provider_subscription
            .items
            .data
            .iter()
            .map(|item| -> BillingResult<_> {
                Ok((item, provider_subscription.period_end_for(item)?.to_datetime()?))
            })
            .collect::<BillingResult<Vec<_>>>()?;

        let mut synced = Vec::with_capacity(items.len());
        for (item, period_end) in items {
            let result = self
                .create_or_update_subscription(
                    db,
                    &item.id,
                    item.price.product.id(),
                    customer.id,
                    period_end,
                    false,
                )
                .await;
            match result {
                Ok(subscription) => synced.push(subscription),
                Err(e) => {
                    tracing::warn!(
                        stripe_subscription_id = %provider_subscription.id,
                        stripe_subscription_item_id = %item.id,
                        error = %e,
                        "Subscription sync failed, rolling back pending items"
                    );
                    if let Err(rollback_error) = db.rollback().await {
                        tracing::error!(error = %rollback_error, "Rollback after failed sync failed");
                    }
                    return Err(e);
                }
            }
        }
        if let Err(e) = db.commit().await {
            if let Err(rollback_error) = db.rollback().await {
                tracing::error!(error = %rollback_error, "Rollback after failed commit failed");
            }
            return Err(e);
        }

        tracing::info!(
            stripe_subscription_id = %provider_subscription.id,
            customer_id = %customer.id,
            items = synced.len(),
            "Synced subscription items from Stripe"
        );

        Ok(synced)
    }

    /// Remove local rows for every item of a Stripe subscription.
    pub async fn delete_subscriptions_from_provider<S>(
        &self,
        db: &mut S,
        provider_subscription: &ProviderSubscription,
    ) -> BillingResult<u64>
    where
        S: BillingStore + ?Sized,
    {
        let item_ids = provider_subscription.item_ids();
        if item_ids.is_empty() {
            return Ok(0);
        }

        let subscriptions = self
            .list_subscriptions(
                db,
                &SubscriptionFilter::default().stripe_subscription_item_ids(item_ids),
                0,
                None,
            )
            .await?;
        let ids: Vec<Uuid> = subscriptions.iter().map(|s| s.id).collect();
        let removed = db.delete_subscriptions(&ids, true).await?;

        tracing::info!(
            stripe_subscription_id = %provider_subscription.id,
            removed = removed,
            "Deleted subscriptions for Stripe subscription"
        );

        Ok(removed)
    }
}
