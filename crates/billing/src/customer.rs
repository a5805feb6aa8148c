//! Customer management

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::BillingResult;
use crate::filter::CustomerFilter;
use crate::models::Customer;
use crate::provider::{NewCustomer, PaymentProvider};
use crate::store::BillingStore;

pub struct CustomerService {
    provider: Arc<dyn PaymentProvider>,
}

impl CustomerService {
    pub fn new(provider: Arc<dyn PaymentProvider>) -> Self {
        Self { provider }
    }

    pub async fn find_customer<S>(
        &self,
        db: &mut S,
        filter: &CustomerFilter,
    ) -> BillingResult<Option<Customer>>
    where
        S: BillingStore + ?Sized,
    {
        db.fetch_customer(filter).await
    }

    /// Create the Stripe customer, then the local row linking it to `user_id`.
    ///
    /// The remote customer is not removed if the local save fails.
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
        let mut metadata = HashMap::new();
        metadata.insert("user_id".to_string(), user_id.to_string());

        let remote = self
            .provider
            .create_customer(NewCustomer {
                name,
                email,
                metadata,
            })
            .await?;

        let customer = Customer::new(user_id, remote.id);
        if let Err(e) = db.save_customer(&customer, true).await {
            tracing::error!(
                user_id = %user_id,
                stripe_customer_id = %customer.stripe_customer_id,
                error = %e,
                "Stripe customer created but local customer could not be saved"
            );
            return Err(e);
        }

        tracing::info!(
            user_id = %user_id,
            customer_id = %customer.id,
            stripe_customer_id = %customer.stripe_customer_id,
            "Created billing customer"
        );

        Ok(customer)
    }

    /// Return the customer for `user_id`, creating it on first use.
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
        if let Some(existing) = self
            .find_customer(db, &CustomerFilter::default().user_id(user_id))
            .await?
        {
            return Ok(existing);
        }

        self.create_customer(db, user_id, name, email).await
    }
}
