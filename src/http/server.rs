//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the control surface and the intercept fallback
//! - Wire up middleware (tracing, limits, request ID)
//! - Bind server to listener
//! - Hand every non-control request to the kernel pipeline

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::ListenerConfig;
use crate::http::control::control_router;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, KernelRequest};
use crate::kernel::Kernel;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub kernel: Arc<Kernel>,
    pub max_body_size: usize,
}

/// HTTP front of the kernel.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(kernel: Arc<Kernel>, config: &ListenerConfig) -> Self {
        let state = AppState {
            kernel,
            max_body_size: config.max_body_size,
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        control_router()
            .fallback(intercept_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// The assembled router, for serving elsewhere.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every request not addressed to the control surface.
async fn intercept_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let path = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());

    let request = KernelRequest {
        method: parts.method,
        path,
        headers: parts.headers,
        body,
    };
    tracing::debug!(
        request_id = %request.request_id(),
        method = %request.method,
        path = %request.path,
        "Intercepting request"
    );

    state.kernel.handle(request).await.into_response()
}
