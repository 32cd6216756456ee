//! The network seam.
//!
//! Everything the kernel calls "the network" goes through [`Fetcher`]: the
//! configuration resource, route targets, mount translations and the cache
//! strategies' fetches. Production uses [`super::upstream::UpstreamFetcher`];
//! tests substitute scripted fetchers.

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::http::{KernelRequest, KernelResponse};

/// Hard network failure. Non-2xx responses are not errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Target could not be turned into an upstream URI.
    #[error("invalid fetch target '{0}'")]
    InvalidTarget(String),

    /// Connection or protocol failure.
    #[error("network error: {0}")]
    Network(String),

    /// No response within the fetch deadline.
    #[error("fetch timed out after {0} seconds")]
    Timeout(u64),
}

/// Issues requests against the network.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, request: KernelRequest) -> BoxFuture<'_, Result<KernelResponse, FetchError>>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetcher shared by unit tests.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::http::StatusCode;
    use futures_util::FutureExt;

    use super::*;

    /// Answers from a path → outcome table; unknown paths get a 404.
    #[derive(Default)]
    pub struct MapFetcher {
        outcomes: Mutex<HashMap<String, Result<KernelResponse, FetchError>>>,
        seen: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn respond(&self, path: &str, status: StatusCode, body: &str) {
            self.outcomes
                .lock()
                .unwrap()
                .insert(path.to_string(), Ok(KernelResponse::new(status, body.to_string())));
        }

        pub fn fail(&self, path: &str) {
            self.outcomes
                .lock()
                .unwrap()
                .insert(path.to_string(), Err(FetchError::Network("connection refused".into())));
        }

        /// Identities of every request fetched so far.
        pub fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Fetcher for MapFetcher {
        fn fetch(&self, request: KernelRequest) -> BoxFuture<'_, Result<KernelResponse, FetchError>> {
            self.seen.lock().unwrap().push(request.identity());
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .get(&request.path)
                .cloned()
                .unwrap_or_else(|| Ok(KernelResponse::new(StatusCode::NOT_FOUND, "not found")));
            async move { outcome }.boxed()
        }
    }
}
