//! The interception kernel.
//!
//! # Data Flow
//! ```text
//! KernelRequest
//!     → intercept gate (kernel.interceptPatterns; miss → forwarded verbatim)
//!     → routing (exact, then patterns) → fetch route target + header overrides
//!     → namespace (longest prefix mount) → fetch translated path
//!     → cache strategy (GET only; other methods are forwarded)
//!     → KernelResponse
//! ```
//!
//! # Design Decisions
//! - Configuration and its compiled matchers form one immutable snapshot,
//!   swapped atomically on reload; a request uses the snapshot it started with
//! - The worker pool is built from the configuration seen at install and is
//!   not rebuilt on reload
//! - No request failure escapes as an error; every outcome is a response

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;

use crate::cache::{CacheLifecycle, CacheStorage, StrategyEngine};
use crate::config::schema::KernelConfig;
use crate::config::{ConfigLoader, ConfigSource};
use crate::control::StatusReport;
use crate::http::{KernelRequest, KernelResponse};
use crate::namespace;
use crate::net::fetcher::Fetcher;
use crate::observability::metrics;
use crate::routing::{PatternSet, Router};
use crate::workers::{ModuleRegistry, WorkerError, WorkerPool, WORKER_CALL_TIMEOUT};

/// Version tag embedded in cache namespace names.
pub const KERNEL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default cache namespace prefix.
pub const DEFAULT_CACHE_PREFIX: &str = "intercept-kernel";

/// A loaded configuration with its matchers compiled.
#[derive(Debug)]
pub struct ActiveConfig {
    pub config: KernelConfig,
    router: Router,
    intercept: PatternSet,
}

impl ActiveConfig {
    pub fn compile(config: KernelConfig) -> Self {
        let router = Router::from_table(&config.routes);
        let intercept = PatternSet::compile(&config.kernel.intercept_patterns);
        Self {
            config,
            router,
            intercept,
        }
    }
}

/// Everything `install` needs besides the network and the config source.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub version: String,
    pub cache_prefix: String,
    pub storage: CacheStorage,
    pub registry: ModuleRegistry,
    pub worker_timeout: Duration,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            version: KERNEL_VERSION.to_string(),
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            storage: CacheStorage::new(),
            registry: ModuleRegistry::default(),
            worker_timeout: WORKER_CALL_TIMEOUT,
        }
    }
}

/// Which pipeline stage produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Bypass,
    Route,
    Mount,
    Strategy,
    Passthrough,
}

impl Handled {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bypass => "bypass",
            Self::Route => "route",
            Self::Mount => "mount",
            Self::Strategy => "strategy",
            Self::Passthrough => "passthrough",
        }
    }
}

/// The running kernel.
pub struct Kernel {
    version: String,
    active: ArcSwap<ActiveConfig>,
    loader: ConfigLoader,
    fetcher: Arc<dyn Fetcher>,
    lifecycle: CacheLifecycle,
    strategies: StrategyEngine,
    workers: WorkerPool,
}

impl Kernel {
    /// Load the configuration and start the worker pool.
    /// Must run within a Tokio runtime.
    pub async fn install(
        fetcher: Arc<dyn Fetcher>,
        source: ConfigSource,
        options: InstallOptions,
    ) -> Result<Self, WorkerError> {
        let loader = ConfigLoader::new(source, Arc::clone(&fetcher));
        let config = loader.load().await;

        let workers = WorkerPool::start_with_timeout(&config.workers, &options.registry, options.worker_timeout)?;
        let lifecycle = CacheLifecycle::new(options.storage, options.cache_prefix, &options.version);
        let strategies = StrategyEngine::new(Arc::clone(&fetcher), lifecycle.clone());

        tracing::info!(
            version = %options.version,
            cache = %lifecycle.current_name(),
            workers = workers.len(),
            "Kernel installed"
        );

        Ok(Self {
            version: options.version,
            active: ArcSwap::from_pointee(ActiveConfig::compile(config)),
            loader,
            fetcher,
            lifecycle,
            strategies,
            workers,
        })
    }

    /// Purge cache generations left by other versions.
    pub fn activate(&self) -> Vec<String> {
        self.lifecycle.activate()
    }

    /// Re-run the config loader and swap the result in.
    pub async fn reload(&self) {
        let config = self.loader.load().await;
        if config.workers != self.active.load().config.workers {
            tracing::warn!("Worker configuration changed; the running pool is kept until restart");
        }
        self.active.store(Arc::new(ActiveConfig::compile(config)));
        tracing::info!("Kernel configuration reloaded");
    }

    /// Drop the running version's cache.
    pub fn clear_cache(&self) -> bool {
        self.lifecycle.clear()
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            version: self.version.clone(),
            config: self.active.load().config.clone(),
            active: true,
            cache: self.lifecycle.current_name().to_string(),
            cache_entries: self.lifecycle.entry_count(),
            workers: self.workers.names().to_vec(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<ActiveConfig> {
        self.active.load_full()
    }

    pub fn lifecycle(&self) -> &CacheLifecycle {
        &self.lifecycle
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.workers
    }

    /// Run one intercepted request through the pipeline.
    pub async fn handle(&self, request: KernelRequest) -> KernelResponse {
        let start = Instant::now();
        let (handled, response) = self.resolve(request).await;
        metrics::record_request(handled.as_str(), response.status.as_u16(), start);
        response
    }

    /// As [`Kernel::handle`], also reporting which stage answered.
    pub async fn resolve(&self, request: KernelRequest) -> (Handled, KernelResponse) {
        let active = self.active.load_full();
        let path = request.path_only();

        if !active.intercept.accepts(path) {
            tracing::trace!(path = %path, "Not intercepted");
            return (Handled::Bypass, self.forward(request).await);
        }

        if let Some(hit) = active.router.match_path(path) {
            let target = hit.target(path, active.config.kernel.route_templating);
            tracing::debug!(path = %path, route = %hit.route.pattern, kind = ?hit.kind, target = %target, "Route matched");
            let response = self.forward(request.retarget(target)).await;
            return (Handled::Route, response.with_headers(&hit.route.headers));
        }

        if let Some(resolution) = namespace::resolve(&active.config.namespace.mounts, path) {
            tracing::debug!(path = %path, mount = %resolution.mount.path, translated = %resolution.translated, "Mount resolved");
            let translated = request.retarget(resolution.translated);
            return (Handled::Mount, self.forward(translated).await);
        }

        if request.is_cacheable() {
            let strategy = active.config.kernel.caching_strategy;
            (Handled::Strategy, self.strategies.execute(strategy, request).await)
        } else {
            (Handled::Passthrough, self.forward(request).await)
        }
    }

    async fn forward(&self, request: KernelRequest) -> KernelResponse {
        let identity = request.identity();
        match self.fetcher.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(request = %identity, error = %e, "Fetch failed");
                KernelResponse::bad_gateway()
            }
        }
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("version", &self.version)
            .field("source", self.loader.source())
            .field("cache", &self.lifecycle.current_name())
            .field("workers", &self.workers)
            .finish()
    }
}
