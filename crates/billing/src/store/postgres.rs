//! PostgreSQL store

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::BillingStore;
use crate::error::BillingResult;
use crate::filter::{CustomerFilter, Filter, Page, SubscriptionFilter};
use crate::models::{Customer, Subscription};

const CUSTOMER_COLUMNS: &str = "id, user_id, stripe_customer_id, created_at, updated_at";

const SUBSCRIPTION_COLUMNS: &str = "s.id, s.customer_id, s.stripe_subscription_item_id, \
     s.stripe_product_id, s.current_period_end, s.created_at, s.updated_at";

/// Unit of work over a connection pool.
///
/// The first write opens a transaction that stays open until it is committed
/// (explicitly or through `auto_commit`). Dropping the store with an open
/// transaction rolls it back.
pub struct PgStore {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    async fn transaction(&mut self) -> BillingResult<&mut Transaction<'static, Postgres>> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };
        Ok(self.tx.insert(tx))
    }

    async fn finish_write(&mut self, auto_commit: bool) -> BillingResult<()> {
        if auto_commit {
            self.commit().await?;
        }
        Ok(())
    }
}

/// Tracks whether the next condition needs `WHERE` or `AND`
#[derive(Default)]
struct Conditions {
    started: bool,
}

impl Conditions {
    fn next(&mut self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
    }
}

fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, column: &str, filter: &Filter<String>) {
    match filter {
        Filter::Unset => {}
        Filter::Null => {
            qb.push(column).push(" IS NULL");
        }
        Filter::Eq(value) => {
            qb.push(column).push(" = ").push_bind(value.clone());
        }
        Filter::In(values) => {
            qb.push(column)
                .push(" = ANY(")
                .push_bind(values.clone())
                .push(")");
        }
    }
}

fn push_condition(
    qb: &mut QueryBuilder<'static, Postgres>,
    conditions: &mut Conditions,
    column: &str,
    filter: &Filter<String>,
) {
    if filter.is_unset() {
        return;
    }
    conditions.next(qb);
    push_predicate(qb, column, filter);
}

fn customer_query(filter: &CustomerFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM billing_customers", CUSTOMER_COLUMNS));
    let mut conditions = Conditions::default();
    push_condition(&mut qb, &mut conditions, "user_id", &filter.user_id);
    push_condition(
        &mut qb,
        &mut conditions,
        "stripe_customer_id",
        &filter.stripe_customer_id,
    );
    qb.push(" ORDER BY created_at DESC LIMIT 1");
    qb
}

fn subscription_query(filter: &SubscriptionFilter, page: Page) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {} FROM billing_subscriptions s",
        SUBSCRIPTION_COLUMNS
    ));
    let mut conditions = Conditions::default();

    if !filter.user_id.is_unset() {
        conditions.next(&mut qb);
        qb.push("EXISTS (SELECT 1 FROM billing_customers c WHERE c.id = s.customer_id AND ");
        push_predicate(&mut qb, "c.user_id", &filter.user_id);
        qb.push(")");
    }
    push_condition(
        &mut qb,
        &mut conditions,
        "s.stripe_subscription_item_id",
        &filter.stripe_subscription_item_id,
    );
    push_condition(
        &mut qb,
        &mut conditions,
        "s.stripe_product_id",
        &filter.stripe_product_id,
    );

    // Same clamping as `Page::new`, for pages built field by field
    qb.push(" ORDER BY s.created_at DESC");
    if let Some(limit) = page.limit {
        qb.push(" LIMIT ").push_bind(limit.max(0));
    }
    if page.offset > 0 {
        qb.push(" OFFSET ").push_bind(page.offset);
    }
    qb
}

#[async_trait]
impl BillingStore for PgStore {
    async fn fetch_customer(&mut self, filter: &CustomerFilter) -> BillingResult<Option<Customer>> {
        let mut qb = customer_query(filter);
        let query = qb.build_query_as::<Customer>();
        let customer = match self.tx.as_mut() {
            Some(tx) => query.fetch_optional(&mut **tx).await?,
            None => query.fetch_optional(&self.pool).await?,
        };
        Ok(customer)
    }

    async fn fetch_subscriptions(
        &mut self,
        filter: &SubscriptionFilter,
        page: Page,
    ) -> BillingResult<Vec<Subscription>> {
        let mut qb = subscription_query(filter, page);
        let query = qb.build_query_as::<Subscription>();
        let subscriptions = match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await?,
            None => query.fetch_all(&self.pool).await?,
        };
        Ok(subscriptions)
    }

    async fn save_customer(&mut self, customer: &Customer, auto_commit: bool) -> BillingResult<()> {
        let tx = self.transaction().await?;
        sqlx::query(
            r#"
            INSERT INTO billing_customers (id, user_id, stripe_customer_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(customer.id)
        .bind(&customer.user_id)
        .bind(&customer.stripe_customer_id)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&mut **tx)
        .await?;

        self.finish_write(auto_commit).await
    }

    async fn save_subscription(
        &mut self,
        subscription: &Subscription,
        auto_commit: bool,
    ) -> BillingResult<()> {
        let tx = self.transaction().await?;
        sqlx::query(
            r#"
            INSERT INTO billing_subscriptions (
                id, customer_id, stripe_subscription_item_id, stripe_product_id,
                current_period_end, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                customer_id = EXCLUDED.customer_id,
                stripe_subscription_item_id = EXCLUDED.stripe_subscription_item_id,
                stripe_product_id = EXCLUDED.stripe_product_id,
                current_period_end = EXCLUDED.current_period_end,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.customer_id)
        .bind(&subscription.stripe_subscription_item_id)
        .bind(&subscription.stripe_product_id)
        .bind(subscription.current_period_end)
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .execute(&mut **tx)
        .await?;

        self.finish_write(auto_commit).await
    }

    async fn delete_subscriptions(
        &mut self,
        ids: &[Uuid],
        auto_commit: bool,
    ) -> BillingResult<u64> {
        let tx = self.transaction().await?;
        let result = sqlx::query("DELETE FROM billing_subscriptions WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut **tx)
            .await?;

        self.finish_write(auto_commit).await?;
        Ok(result.rows_affected())
    }

    async fn commit(&mut self) -> BillingResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> BillingResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_query_without_filters_is_unconstrained() {
        let qb = customer_query(&CustomerFilter::default());
        assert_eq!(
            qb.sql(),
            "SELECT id, user_id, stripe_customer_id, created_at, updated_at \
             FROM billing_customers ORDER BY created_at DESC LIMIT 1"
        );
    }

    #[test]
    fn test_customer_query_combines_filters_with_and() {
        let filter = CustomerFilter::default()
            .user_id("user_1")
            .stripe_customer_id("cus_1");
        let qb = customer_query(&filter);
        assert!(qb
            .sql()
            .contains(" WHERE user_id = $1 AND stripe_customer_id = $2 ORDER BY"));
    }

    #[test]
    fn test_customer_query_null_filter() {
        let filter = CustomerFilter {
            user_id: Filter::Null,
            ..Default::default()
        };
        let qb = customer_query(&filter);
        assert!(qb.sql().contains(" WHERE user_id IS NULL ORDER BY"));
    }

    #[test]
    fn test_subscription_query_user_filter_goes_through_customer() {
        let filter = SubscriptionFilter::default()
            .user_id("user_1")
            .stripe_product_ids(["prod_1", "prod_2"]);
        let qb = subscription_query(&filter, Page::new(20, Some(10)));
        let sql = qb.sql();
        assert!(sql.contains(
            " WHERE EXISTS (SELECT 1 FROM billing_customers c \
             WHERE c.id = s.customer_id AND c.user_id = $1)"
        ));
        assert!(sql.contains(" AND s.stripe_product_id = ANY($2)"));
        assert!(sql.ends_with(" ORDER BY s.created_at DESC LIMIT $3 OFFSET $4"));
    }

    #[test]
    fn test_subscription_query_negative_offset_is_dropped() {
        let page = Page {
            offset: -3,
            limit: Some(-1),
        };
        let qb = subscription_query(&SubscriptionFilter::default(), page);
        assert!(qb.sql().ends_with(" ORDER BY s.created_at DESC LIMIT $1"));
    }

    #[test]
    fn test_subscription_query_unbounded_page() {
        let qb = subscription_query(&SubscriptionFilter::default(), Page::all());
        assert!(!qb.sql().contains("WHERE"));
        assert!(qb.sql().ends_with(" ORDER BY s.created_at DESC"));
    }

    /// Needs a reachable database with the billing migrations applied.
    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_store_upsert_and_rollback() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        let mut store = PgStore::new(pool);

        let user_id = format!("user_{}", Uuid::new_v4());
        let customer = Customer::new(&user_id, format!("cus_{}", Uuid::new_v4()));
        store.save_customer(&customer, true).await.unwrap();
        assert!(!store.in_transaction());

        let pending = Subscription::new(
            customer.id,
            format!("si_{}", Uuid::new_v4()),
            "prod_1",
            time::OffsetDateTime::now_utc(),
        );
        store.save_subscription(&pending, false).await.unwrap();
        let visible = store
            .fetch_subscriptions(&SubscriptionFilter::default().user_id(&user_id), Page::all())
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);

        store.rollback().await.unwrap();
        let after = store
            .fetch_subscriptions(&SubscriptionFilter::default().user_id(&user_id), Page::all())
            .await
            .unwrap();
        assert!(after.is_empty());

        let found = store
            .fetch_customer(&CustomerFilter::default().user_id(&user_id))
            .await
            .unwrap();
        assert_eq!(found.map(|c| c.id), Some(customer.id));
    }
}
