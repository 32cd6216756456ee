//! Upstream origin client.
//!
//! # Responsibilities
//! - Resolve kernel paths against the configured origin
//! - Forward method, headers and body with a per-fetch timeout
//! - Buffer the response body up to a size limit
//!
//! # Design Decisions
//! - hyper-util legacy client with connection pooling
//! - No retries: every strategy decides for itself what a failure means
//! - Hop-by-hop `host` header is rewritten to the origin's authority

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::config::schema::UpstreamConfig;
use crate::http::{KernelRequest, KernelResponse};
use crate::net::fetcher::{FetchError, Fetcher};

/// Fetcher backed by an HTTP origin.
#[derive(Clone)]
pub struct UpstreamFetcher {
    origin: Url,
    client: Client<HttpConnector, Body>,
    timeout: Duration,
    max_response_size: usize,
}

impl UpstreamFetcher {
    /// Create a fetcher for the configured origin.
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let origin = Url::parse(&config.origin)
            .map_err(|e| FetchError::InvalidTarget(format!("{}: {}", config.origin, e)))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            origin,
            client,
            timeout: Duration::from_secs(config.timeout_secs),
            max_response_size: config.max_response_size,
        })
    }

    /// Absolute URL for a kernel path. Paths that would leave the origin,
    /// such as `//host/x` or an absolute URL, are rejected.
    pub fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        let url = self
            .origin
            .join(path)
            .map_err(|e| FetchError::InvalidTarget(format!("{}: {}", path, e)))?;
        if url.origin() != self.origin.origin() {
            return Err(FetchError::InvalidTarget(format!("{}: leaves origin {}", path, self.origin)));
        }
        Ok(url)
    }

    async fn send(&self, request: KernelRequest) -> Result<KernelResponse, FetchError> {
        let url = self.resolve(&request.path)?;

        let mut builder = Request::builder().method(request.method.clone()).uri(url.as_str());
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in request.headers.iter() {
                if name != header::HOST && !is_hop_by_hop(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
            if let Some(host) = url.host_str() {
                let authority = match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                };
                if let Ok(value) = HeaderValue::from_str(&authority) {
                    headers.insert(header::HOST, value);
                }
            }
        }
        let outbound = builder
            .body(Body::from(request.body))
            .map_err(|e| FetchError::InvalidTarget(e.to_string()))?;

        let response: hyper::Response<Incoming> = match tokio::time::timeout(self.timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(FetchError::Network(e.to_string())),
            Err(_) => return Err(FetchError::Timeout(self.timeout.as_secs())),
        };

        let (mut parts, body) = response.into_parts();
        parts.headers.remove(header::TRANSFER_ENCODING);
        parts.headers.remove(header::CONNECTION);
        let body = axum::body::to_bytes(Body::new(body), self.max_response_size)
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(KernelResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

/// Headers describing the inbound connection, not the buffered message.
fn is_hop_by_hop(name: &header::HeaderName) -> bool {
    [
        header::CONNECTION,
        header::TRANSFER_ENCODING,
        header::CONTENT_LENGTH,
        header::TE,
        header::UPGRADE,
    ]
    .contains(name)
}

impl Fetcher for UpstreamFetcher {
    fn fetch(&self, request: KernelRequest) -> BoxFuture<'_, Result<KernelResponse, FetchError>> {
        self.send(request).boxed()
    }
}

impl std::fmt::Debug for UpstreamFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamFetcher")
            .field("origin", &self.origin.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}
