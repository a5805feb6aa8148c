//! Billing errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Stripe API error: {0}")]
    StripeApi(#[from] stripe::StripeError),

    /// Provider failure that did not come from the Stripe SDK
    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Webhook signature invalid")]
    WebhookSignatureInvalid,

    #[error("Webhook payload invalid: {0}")]
    WebhookPayload(#[from] serde_json::Error),

    #[error("Webhook event not supported: {0}")]
    WebhookEventNotSupported(String),
}

pub type BillingResult<T> = Result<T, BillingError>;
