//! Caching strategies.
//!
//! # Strategies
//! - `cache-first`: serve from cache; on miss fetch, store if ok, return.
//!   Network failure on a miss → 503 offline response.
//! - `network-first`: fetch, store if ok, return. Network failure → cached
//!   entry if any, otherwise 503 "no cache available".
//! - `stale-while-revalidate`: serve from cache immediately and refresh the
//!   entry in the background; on miss behave like `cache-first`.
//!
//! # Design Decisions
//! - Only 2xx responses are stored; other statuses pass through untouched
//! - Hard network failures never escape as errors, only as responses
//! - The cache namespace is opened per request so a manual clear is
//!   observed by the next request

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::lifecycle::CacheLifecycle;
use crate::http::{KernelRequest, KernelResponse};
use crate::net::fetcher::Fetcher;
use crate::observability::metrics;

/// Fetch/cache policy for requests not handled by a route or mount.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CachingStrategy {
    CacheFirst,
    #[default]
    NetworkFirst,
    StaleWhileRevalidate,
}

impl CachingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CachingStrategy::CacheFirst => "cache-first",
            CachingStrategy::NetworkFirst => "network-first",
            CachingStrategy::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

impl std::fmt::Display for CachingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executes caching strategies against the running version's cache.
#[derive(Clone)]
pub struct StrategyEngine {
    fetcher: Arc<dyn Fetcher>,
    lifecycle: CacheLifecycle,
}

impl StrategyEngine {
    pub fn new(fetcher: Arc<dyn Fetcher>, lifecycle: CacheLifecycle) -> Self {
        Self { fetcher, lifecycle }
    }

    /// Run `strategy` for a cacheable request.
    pub async fn execute(&self, strategy: CachingStrategy, request: KernelRequest) -> KernelResponse {
        match strategy {
            CachingStrategy::CacheFirst => self.cache_first(request).await,
            CachingStrategy::NetworkFirst => self.network_first(request).await,
            CachingStrategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    async fn cache_first(&self, request: KernelRequest) -> KernelResponse {
        let key = request.identity();
        let cache = self.lifecycle.current();

        if let Some(cached) = cache.get(&key) {
            metrics::record_cache_lookup(CachingStrategy::CacheFirst.as_str(), true);
            tracing::debug!(key = %key, "Cache hit");
            return cached;
        }
        metrics::record_cache_lookup(CachingStrategy::CacheFirst.as_str(), false);

        self.fetch_and_store(request, CachingStrategy::CacheFirst).await
    }

    async fn network_first(&self, request: KernelRequest) -> KernelResponse {
        let key = request.identity();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.lifecycle.current().put(key, response.clone());
                }
                response
            }
            Err(e) => {
                let cached = self.lifecycle.current().get(&key);
                metrics::record_cache_lookup(CachingStrategy::NetworkFirst.as_str(), cached.is_some());
                match cached {
                    Some(cached) => {
                        tracing::warn!(key = %key, error = %e, "Network failed, serving cached response");
                        cached
                    }
                    None => {
                        tracing::warn!(key = %key, error = %e, "Network failed and nothing cached");
                        KernelResponse::no_cache_available()
                    }
                }
            }
        }
    }

    async fn stale_while_revalidate(&self, request: KernelRequest) -> KernelResponse {
        let key = request.identity();
        let cache = self.lifecycle.current();

        let Some(cached) = cache.get(&key) else {
            metrics::record_cache_lookup(CachingStrategy::StaleWhileRevalidate.as_str(), false);
            return self
                .fetch_and_store(request, CachingStrategy::StaleWhileRevalidate)
                .await;
        };
        metrics::record_cache_lookup(CachingStrategy::StaleWhileRevalidate.as_str(), true);

        let fetcher = Arc::clone(&self.fetcher);
        tokio::spawn(async move {
            match fetcher.fetch(request).await {
                Ok(fresh) if fresh.is_ok() => {
                    cache.put(key.as_str(), fresh);
                    tracing::debug!(key = %key, "Revalidated cache entry");
                }
                Ok(fresh) => {
                    tracing::debug!(key = %key, status = %fresh.status, "Revalidation returned non-success, keeping cached entry");
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Background revalidation failed");
                }
            }
        });

        cached
    }

    async fn fetch_and_store(&self, request: KernelRequest, strategy: CachingStrategy) -> KernelResponse {
        let key = request.identity();
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.lifecycle.current().put(key, response.clone());
                }
                response
            }
            Err(e) => {
                tracing::warn!(key = %key, strategy = %strategy, error = %e, "Network failed on cache miss");
                KernelResponse::offline()
            }
        }
    }
}
