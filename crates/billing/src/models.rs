//! Local billing records

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};

/// Link between an application user and a Stripe customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    /// Opaque identifier of the user in the host application
    pub user_id: String,
    pub stripe_customer_id: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Customer {
    pub fn new(user_id: impl Into<String>, stripe_customer_id: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            stripe_customer_id: stripe_customer_id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Local mirror of one Stripe subscription item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Natural key, unique across all subscriptions
    pub stripe_subscription_item_id: String,
    pub stripe_product_id: String,
    pub current_period_end: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Subscription {
    pub fn new(
        customer_id: Uuid,
        stripe_subscription_item_id: impl Into<String>,
        stripe_product_id: impl Into<String>,
        current_period_end: OffsetDateTime,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            stripe_subscription_item_id: stripe_subscription_item_id.into(),
            stripe_product_id: stripe_product_id.into(),
            current_period_end,
            created_at: now,
            updated_at: now,
        }
    }
}

/// End of a billing period as Stripe sends it (Unix seconds) or as a date-time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodEnd {
    Timestamp(i64),
    DateTime(OffsetDateTime),
}

impl PeriodEnd {
    /// Timestamps are interpreted as UTC.
    pub fn to_datetime(self) -> BillingResult<OffsetDateTime> {
        match self {
            PeriodEnd::Timestamp(seconds) => OffsetDateTime::from_unix_timestamp(seconds)
                .map_err(|e| {
                    BillingError::InvalidInput(format!(
                        "Invalid period end timestamp {}: {}",
                        seconds, e
                    ))
                }),
            PeriodEnd::DateTime(datetime) => Ok(datetime),
        }
    }
}

impl From<i64> for PeriodEnd {
    fn from(seconds: i64) -> Self {
        PeriodEnd::Timestamp(seconds)
    }
}

impl From<OffsetDateTime> for PeriodEnd {
    fn from(datetime: OffsetDateTime) -> Self {
        PeriodEnd::DateTime(datetime)
    }
}
