//! Stripe webhook handling
//!
//! Verifies the `Stripe-Signature` header and routes subscription events to
//! the subscription sync operations. Events are parsed with this crate's own
//! payload types instead of the SDK's, so newer API versions still parse.

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use time::OffsetDateTime;

use crate::config::StripeConfig;
use crate::error::{BillingError, BillingResult};
use crate::models::Subscription;
use crate::provider::ProviderSubscription;
use crate::store::BillingStore;
use crate::subscriptions::SubscriptionService;

type HmacSha256 = Hmac<Sha256>;

/// A verified webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub created: i64,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// What `handle_event` did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Subscription items upserted; empty when the customer is unknown locally
    Synced(Vec<Subscription>),
    /// Number of local subscriptions removed
    Deleted(u64),
    /// Event type with no handler
    Ignored,
}

pub struct WebhookHandler {
    subscriptions: SubscriptionService,
    webhook_secret: String,
    tolerance: Duration,
}

impl WebhookHandler {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            subscriptions: SubscriptionService::new(),
            webhook_secret: config.webhook_secret.clone(),
            tolerance: config.webhook_tolerance,
        }
    }

    /// Verify the signature header and parse the event
    pub fn verify_event(&self, payload: &str, signature: &str) -> BillingResult<WebhookEvent> {
        self.verify_event_at(payload, signature, OffsetDateTime::now_utc().unix_timestamp())
    }

    fn verify_event_at(
        &self,
        payload: &str,
        signature: &str,
        now: i64,
    ) -> BillingResult<WebhookEvent> {
        // Header format: t=timestamp,v1=signature[,v1=...][,v0=...]
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => timestamp = value.parse().ok(),
                    "v1" => v1_signatures.push(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            tracing::warn!("Missing timestamp in webhook signature header");
            BillingError::WebhookSignatureInvalid
        })?;

        if v1_signatures.is_empty() {
            tracing::warn!("Missing v1 signature in webhook signature header");
            return Err(BillingError::WebhookSignatureInvalid);
        }

        let age = now.abs_diff(timestamp);
        if age > self.tolerance.as_secs() {
            tracing::warn!(
                timestamp = timestamp,
                now = now,
                age_secs = age,
                "Webhook timestamp outside tolerance"
            );
            return Err(BillingError::WebhookSignatureInvalid);
        }

        let signed_payload = format!("{}.{}", timestamp, payload);
        let verified = v1_signatures.iter().any(|candidate| {
            let Ok(expected) = hex::decode(candidate) else {
                return false;
            };
            let Ok(mut mac) = HmacSha256::new_from_slice(self.webhook_secret.as_bytes()) else {
                return false;
            };
            mac.update(signed_payload.as_bytes());
            mac.verify_slice(&expected).is_ok()
        });

        if !verified {
            tracing::warn!("Webhook signature mismatch");
            return Err(BillingError::WebhookSignatureInvalid);
        }

        let event: WebhookEvent = serde_json::from_str(payload)?;
        tracing::info!(
            event_type = %event.type_,
            event_id = %event.id,
            "Verified Stripe webhook"
        );
        Ok(event)
    }

    /// Apply a verified event to the local store
    pub async fn handle_event<S>(&self, db: &mut S, event: WebhookEvent) -> BillingResult<WebhookOutcome>
    where
        S: BillingStore + ?Sized,
    {
        match event.type_.as_str() {
            "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.paused"
            | "customer.subscription.resumed" => {
                let subscription = self.extract_subscription(event)?;
                let synced = self
                    .subscriptions
                    .sync_subscriptions_from_provider(db, &subscription)
                    .await?;
                Ok(WebhookOutcome::Synced(synced))
            }
            "customer.subscription.deleted" => {
                let subscription = self.extract_subscription(event)?;
                let removed = self
                    .subscriptions
                    .delete_subscriptions_from_provider(db, &subscription)
                    .await?;
                Ok(WebhookOutcome::Deleted(removed))
            }
            _ => {
                tracing::info!(
                    event_type = %event.type_,
                    event_id = %event.id,
                    "Received unhandled Stripe event type"
                );
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    fn extract_subscription(&self, event: WebhookEvent) -> BillingResult<ProviderSubscription> {
        let object_type = event
            .data
            .object
            .get("object")
            .and_then(|o| o.as_str())
            .unwrap_or("subscription");
        if object_type != "subscription" {
            return Err(BillingError::WebhookEventNotSupported(format!(
                "Expected subscription, got {}",
                object_type
            )));
        }
        Ok(serde_json::from_value(event.data.object)?)
    }
}
