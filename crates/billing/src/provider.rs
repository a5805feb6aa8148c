//! Payment provider seam and the payload types read from it
//!
//! The subscription types deserialize straight from Stripe webhook JSON, so
//! payloads from API versions newer than the SDK still parse.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, BillingResult};
use crate::models::PeriodEnd;

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn retrieve_price(&self, price_id: &str) -> BillingResult<ProviderPrice>;

    async fn create_customer(&self, params: NewCustomer<'_>) -> BillingResult<ProviderCustomer>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPrice {
    pub id: String,
    pub product_id: Option<String>,
    /// Amount in the smallest currency unit
    pub unit_amount: Option<i64>,
    pub currency: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCustomer {
    pub id: String,
}

/// Parameters for creating a remote customer
#[derive(Debug, Clone, Default)]
pub struct NewCustomer<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub metadata: HashMap<String, String>,
}

/// Reference to a Stripe object that may or may not be expanded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Id(String),
    Object(ExpandedObject),
}

/// The part of an expanded object this crate reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedObject {
    pub id: String,
}

impl ObjectRef {
    pub fn id(&self) -> &str {
        match self {
            ObjectRef::Id(id) => id,
            ObjectRef::Object(object) => &object.id,
        }
    }
}

impl From<&str> for ObjectRef {
    fn from(id: &str) -> Self {
        ObjectRef::Id(id.to_string())
    }
}

/// A Stripe subscription as delivered by webhooks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer: ObjectRef,
    pub items: ItemList,
    /// Subscription-level period end, only sent by older API versions
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList {
    pub data: Vec<ProviderSubscriptionItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSubscriptionItem {
    pub id: String,
    pub price: ItemPrice,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPrice {
    pub id: String,
    pub product: ObjectRef,
}

impl ProviderSubscription {
    pub fn customer_id(&self) -> &str {
        self.customer.id()
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.items.data.iter().map(|item| item.id.clone()).collect()
    }

    /// Period end for `item`, falling back to the subscription's own value.
    pub fn period_end_for(&self, item: &ProviderSubscriptionItem) -> BillingResult<PeriodEnd> {
        item.current_period_end
            .or(self.current_period_end)
            .map(PeriodEnd::Timestamp)
            .ok_or_else(|| {
                BillingError::InvalidInput(format!(
                    "Subscription item {} on {} has no current_period_end",
                    item.id, self.id
                ))
            })
    }
}

fn expandable_id<T: stripe::Object>(reference: &stripe::Expandable<T>) -> String
where
    T::Id: std::fmt::Display,
{
    match reference {
        stripe::Expandable::Id(id) => id.to_string(),
        stripe::Expandable::Object(object) => object.id().to_string(),
    }
}

impl TryFrom<&stripe::Subscription> for ProviderSubscription {
    type Error = BillingError;

    fn try_from(subscription: &stripe::Subscription) -> BillingResult<Self> {
        let data = subscription
            .items
            .data
            .iter()
            .map(|item| {
                let price = item.price.as_ref().ok_or_else(|| {
                    BillingError::InvalidInput(format!("Subscription item {} has no price", item.id))
                })?;
                let product = price.product.as_ref().ok_or_else(|| {
                    BillingError::InvalidInput(format!("Price {} has no product", price.id))
                })?;
                Ok(ProviderSubscriptionItem {
                    id: item.id.to_string(),
                    price: ItemPrice {
                        id: price.id.to_string(),
                        product: ObjectRef::Id(expandable_id(product)),
                    },
                    current_period_end: None,
                })
            })
            .collect::<BillingResult<Vec<_>>>()?;

        Ok(Self {
            id: subscription.id.to_string(),
            customer: ObjectRef::Id(expandable_id(&subscription.customer)),
            items: ItemList { data },
            current_period_end: Some(subscription.current_period_end),
        })
    }
}
