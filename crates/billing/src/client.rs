//! Stripe client

use async_trait::async_trait;
use stripe::{CreateCustomer, Customer, Price, PriceId};

use crate::config::StripeConfig;
use crate::error::{BillingError, BillingResult};
use crate::provider::{NewCustomer, PaymentProvider, ProviderCustomer, ProviderPrice};

/// Thin wrapper over the async-stripe client
#[derive(Clone)]
pub struct StripeClient {
    client: stripe::Client,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: stripe::Client::new(config.secret_key.clone()),
        }
    }

    pub fn from_env() -> BillingResult<Self> {
        Ok(Self::new(&StripeConfig::from_env()?))
    }

    pub fn inner(&self) -> &stripe::Client {
        &self.client
    }
}

impl From<Price> for ProviderPrice {
    fn from(price: Price) -> Self {
        let product_id = price.product.as_ref().map(|product| match product {
            stripe::Expandable::Id(id) => id.to_string(),
            stripe::Expandable::Object(product) => product.id.to_string(),
        });
        Self {
            id: price.id.to_string(),
            product_id,
            unit_amount: price.unit_amount,
            currency: price.currency.map(|c| c.to_string()),
            active: price.active.unwrap_or(false),
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn retrieve_price(&self, price_id: &str) -> BillingResult<ProviderPrice> {
        let id = price_id
            .parse::<PriceId>()
            .map_err(|e| BillingError::InvalidInput(format!("Invalid price ID: {}", e)))?;

        let price = Price::retrieve(self.inner(), &id, &[]).await?;
        tracing::debug!(price_id = %price.id, "Retrieved Stripe price");
        Ok(price.into())
    }

    async fn create_customer(&self, params: NewCustomer<'_>) -> BillingResult<ProviderCustomer> {
        let metadata = (!params.metadata.is_empty()).then(|| params.metadata.clone());
        let create = CreateCustomer {
            name: params.name,
            email: params.email,
            metadata,
            ..Default::default()
        };

        let customer = Customer::create(self.inner(), create).await?;
        tracing::info!(customer_id = %customer.id, "Created Stripe customer");

        Ok(ProviderCustomer {
            id: customer.id.to_string(),
        })
    }
}
