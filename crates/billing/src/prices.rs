//! Price lookups with a short-lived read-through cache

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::config::PriceCacheConfig;
use crate::error::BillingResult;
use crate::provider::{PaymentProvider, ProviderPrice};

#[derive(Debug, Clone)]
struct CachedPrice {
    price: ProviderPrice,
    cached_at: Instant,
}

/// Bounded TTL cache keyed by price id.
///
/// When full, expired entries are dropped first, then the oldest entry.
#[derive(Debug)]
pub struct PriceCache {
    entries: RwLock<HashMap<String, CachedPrice>>,
    config: PriceCacheConfig,
}

impl PriceCache {
    pub fn new(config: PriceCacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub async fn get(&self, price_id: &str) -> Option<ProviderPrice> {
        let entries = self.entries.read().await;
        entries
            .get(price_id)
            .filter(|cached| cached.cached_at.elapsed() < self.config.ttl)
            .map(|cached| cached.price.clone())
    }

    pub async fn insert(&self, price: ProviderPrice) {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.config.capacity && !entries.contains_key(&price.id) {
            let ttl = self.config.ttl;
            entries.retain(|_, cached| cached.cached_at.elapsed() < ttl);

            if entries.len() >= self.config.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, cached)| cached.cached_at)
                    .map(|(id, _)| id.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            price.id.clone(),
            CachedPrice {
                price,
                cached_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Price lookups through the provider
pub struct PriceService {
    provider: Arc<dyn PaymentProvider>,
    cache: PriceCache,
}

impl PriceService {
    pub fn new(provider: Arc<dyn PaymentProvider>, config: PriceCacheConfig) -> Self {
        Self {
            provider,
            cache: PriceCache::new(config),
        }
    }

    /// Fetch a price, serving it from the cache while the entry is fresh.
    ///
    /// Two concurrent misses for the same id both go to the provider.
    pub async fn fetch_price(&self, price_id: &str) -> BillingResult<ProviderPrice> {
        if let Some(price) = self.cache.get(price_id).await {
            tracing::debug!(price_id = %price_id, "Price cache hit");
            return Ok(price);
        }

        tracing::debug!(price_id = %price_id, "Price cache miss");
        let price = self.provider.retrieve_price(price_id).await?;
        self.cache.insert(price.clone()).await;
        Ok(price)
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }
}
