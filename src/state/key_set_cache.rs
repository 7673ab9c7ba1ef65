// Moka cache for issuer key sets

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::auth::jwks::{KeySet, KeySetSource};
use crate::core::errors::AuthError;

/// Minimum spacing of kid-miss refreshes for one issuer
pub const DEFAULT_MIN_REFRESH_SECS: u64 = 30;

/// Process-wide key-set cache keyed by issuer URL.
///
/// Entries are whole key sets behind an `Arc`; a refresh inserts a new set
/// instead of mutating the old one, so concurrent validators see either the
/// previous set or the new one. Concurrent misses for one issuer share a
/// single fetch. Failed fetches are not cached.
///
/// A token naming an unknown kid forces at most one refresh per issuer
/// within the minimum refresh interval; later misses in that window are
/// answered from the cached set.
pub struct KeySetCache {
    source: Arc<dyn KeySetSource + Send + Sync>,
    cache: Option<Cache<String, Arc<KeySet>>>,
    recent_refreshes: Option<Cache<String, ()>>,
    max_capacity: u64,
}

impl KeySetCache {
    /// Create a cache over `source`
    ///
    /// # Parameters
    /// * `source` - Fetches key sets on miss
    /// * `ttl_secs` - Time-to-live for a cached key set; `0` disables caching
    /// * `max_capacity` - Maximum number of issuers kept
    pub fn new(source: Arc<dyn KeySetSource + Send + Sync>, ttl_secs: u64, max_capacity: u64) -> Self {
        let cache = (ttl_secs > 0).then(|| {
            Cache::builder()
                .time_to_live(Duration::from_secs(ttl_secs))
                .max_capacity(max_capacity)
                .build()
        });
        Self {
            source,
            cache,
            recent_refreshes: refresh_window(DEFAULT_MIN_REFRESH_SECS, max_capacity),
            max_capacity,
        }
    }

    /// Replace the minimum refresh interval; `0` refreshes on every kid miss
    pub fn with_min_refresh_interval(mut self, secs: u64) -> Self {
        self.recent_refreshes = refresh_window(secs, self.max_capacity);
        self
    }

    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// Key set for `issuer`, refreshed once if it has no key named `kid`.
    ///
    /// The returned set may still lack `kid`; the caller reports that.
    pub async fn key_set_for(&self, issuer: &str, kid: &str) -> Result<Arc<KeySet>, AuthError> {
        let Some(ref cache) = self.cache else {
            return self.source.fetch_key_set(issuer).await;
        };

        let key_set = self.load(cache, issuer).await?;
        if key_set.contains(kid) {
            return Ok(key_set);
        }

        if !self.refresh_allowed(issuer).await {
            debug!(issuer = %issuer, kid = %kid, "Key id not in cached JWKS, refreshed recently");
            return Ok(key_set);
        }

        info!(issuer = %issuer, kid = %kid, "Key id not in cached JWKS, refreshing");
        cache.invalidate(issuer).await;
        self.load(cache, issuer).await
    }

    /// Claim the refresh slot for `issuer`; only the first caller in a window wins
    async fn refresh_allowed(&self, issuer: &str) -> bool {
        match self.recent_refreshes {
            Some(ref recent) => recent.entry(issuer.to_string()).or_insert(()).await.is_fresh(),
            None => true,
        }
    }

    async fn load(
        &self,
        cache: &Cache<String, Arc<KeySet>>,
        issuer: &str,
    ) -> Result<Arc<KeySet>, AuthError> {
        cache
            .try_get_with(issuer.to_string(), async {
                debug!(issuer = %issuer, "JWKS cache miss");
                self.source.fetch_key_set(issuer).await
            })
            .await
            .map_err(|e| (*e).clone())
    }
}

fn refresh_window(secs: u64, max_capacity: u64) -> Option<Cache<String, ()>> {
    (secs > 0).then(|| {
        Cache::builder()
            .time_to_live(Duration::from_secs(secs))
            .max_capacity(max_capacity)
            .build()
    })
}
