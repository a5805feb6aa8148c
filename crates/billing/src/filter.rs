//! Query filters for customers and subscriptions
//!
//! Every field defaults to [`Filter::Unset`], which places no constraint on
//! the query. Set fields are combined with AND.

/// Constraint on a single column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Filter<T> {
    /// Not provided: matches every row
    #[default]
    Unset,
    /// Provided as null: matches rows where the column is NULL
    Null,
    Eq(T),
    /// Matches when the column equals any of the values; an empty list matches nothing
    In(Vec<T>),
}

impl<T: PartialEq> Filter<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Filter::Unset)
    }

    /// Evaluate against a column value, `None` standing for NULL.
    pub fn matches(&self, value: Option<&T>) -> bool {
        match self {
            Filter::Unset => true,
            Filter::Null => value.is_none(),
            Filter::Eq(expected) => value == Some(expected),
            Filter::In(candidates) => value.is_some_and(|v| candidates.contains(v)),
        }
    }
}

impl<T> From<Option<T>> for Filter<T> {
    /// `Some` becomes an equality filter, `None` a NULL filter.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Filter::Eq(v),
            None => Filter::Null,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilter {
    pub user_id: Filter<String>,
    pub stripe_customer_id: Filter<String>,
}

impl CustomerFilter {
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Filter::Eq(user_id.into());
        self
    }

    pub fn stripe_customer_id(mut self, stripe_customer_id: impl Into<String>) -> Self {
        self.stripe_customer_id = Filter::Eq(stripe_customer_id.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    /// Matched against the owning customer's `user_id`
    pub user_id: Filter<String>,
    pub stripe_subscription_item_id: Filter<String>,
    pub stripe_product_id: Filter<String>,
}

impl SubscriptionFilter {
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Filter::Eq(user_id.into());
        self
    }

    pub fn stripe_subscription_item_id(mut self, item_id: impl Into<String>) -> Self {
        self.stripe_subscription_item_id = Filter::Eq(item_id.into());
        self
    }

    pub fn stripe_subscription_item_ids<I, S>(mut self, item_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stripe_subscription_item_id = Filter::In(item_ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn stripe_product_ids<I, S>(mut self, product_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stripe_product_id = Filter::In(product_ids.into_iter().map(Into::into).collect());
        self
    }
}

/// Offset/limit pagination; `limit = None` returns every remaining row.
///
/// Negative values count as zero: a negative offset skips nothing and a
/// negative limit returns an empty page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: Option<i64>,
}

impl Page {
    pub fn new(offset: i64, limit: Option<i64>) -> Self {
        Self {
            offset: offset.max(0),
            limit: limit.map(|limit| limit.max(0)),
        }
    }

    pub fn first() -> Self {
        Self {
            offset: 0,
            limit: Some(1),
        }
    }

    pub fn all() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_matches_everything() {
        let filter: Filter<String> = Filter::Unset;
        assert!(filter.matches(None));
        assert!(filter.matches(Some(&"anything".to_string())));
    }

    #[test]
    fn test_null_is_distinct_from_unset() {
        let filter: Filter<String> = Filter::from(None);
        assert_eq!(filter, Filter::Null);
        assert!(filter.matches(None));
        assert!(!filter.matches(Some(&"user_1".to_string())));
    }

    #[test]
    fn test_in_filter() {
        let filter = Filter::In(vec!["a".to_string(), "b".to_string()]);
        assert!(filter.matches(Some(&"b".to_string())));
        assert!(!filter.matches(Some(&"c".to_string())));
        assert!(!filter.matches(None));

        let empty: Filter<String> = Filter::In(vec![]);
        assert!(!empty.matches(Some(&"a".to_string())));
    }

    #[test]
    fn test_negative_page_values_are_clamped() {
        assert_eq!(Page::new(-5, Some(-1)), Page::new(0, Some(0)));
        assert_eq!(Page::new(-5, None), Page::all());
        assert_eq!(Page::new(3, Some(2)), Page { offset: 3, limit: Some(2) });
    }

    #[test]
    fn test_builders_only_touch_their_field() {
        let filter = SubscriptionFilter::default().stripe_subscription_item_ids(["si_1", "si_2"]);
        assert!(filter.user_id.is_unset());
        assert!(filter.stripe_product_id.is_unset());
        assert_eq!(
            filter.stripe_subscription_item_id,
            Filter::In(vec!["si_1".to_string(), "si_2".to_string()])
        );
    }
}
