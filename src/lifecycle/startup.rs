//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the upstream fetcher and install the kernel
//! - Activate the kernel (purge stale cache generations)
//! - Start background tasks (config file watch, SIGHUP reload, metrics)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::schema::HostSettings;
use crate::config::watcher::ConfigWatcher;
use crate::config::ConfigSource;
use crate::http::HttpServer;
use crate::kernel::{InstallOptions, Kernel};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::net::fetcher::FetchError;
use crate::net::upstream::UpstreamFetcher;
use crate::observability::metrics;
use crate::workers::WorkerError;

/// Quiet period after a config file event before reloading.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("upstream: {0}")]
    Upstream(#[from] FetchError),

    #[error("workers: {0}")]
    Workers(#[from] WorkerError),

    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
}

/// An installed, activated kernel and the server in front of it.
pub struct Runtime {
    pub kernel: Arc<Kernel>,
    pub server: HttpServer,
    /// Live while the configuration file is watched.
    pub watcher: Option<RecommendedWatcher>,
}

/// Install and activate the kernel described by `settings`.
pub async fn build(settings: &HostSettings) -> Result<Runtime, StartupError> {
    let fetcher = Arc::new(UpstreamFetcher::new(&settings.upstream)?);
    let source = ConfigSource::from_settings(settings);
    let options = InstallOptions {
        cache_prefix: settings.kernel.cache_prefix.clone(),
        ..InstallOptions::default()
    };

    let kernel = Arc::new(Kernel::install(fetcher, source.clone(), options).await?);
    kernel.activate();

    let watcher = match &source {
        ConfigSource::File(path) => Some(watch_config(Arc::clone(&kernel), path)?),
        ConfigSource::Remote(_) => None,
    };

    let server = HttpServer::new(Arc::clone(&kernel), &settings.listener);
    Ok(Runtime {
        kernel,
        server,
        watcher,
    })
}

/// Reload the kernel whenever the configuration file changes.
fn watch_config(kernel: Arc<Kernel>, path: &Path) -> Result<RecommendedWatcher, notify::Error> {
    let (watcher, mut reloads) = ConfigWatcher::new(path);
    let handle = watcher.run()?;

    tokio::spawn(async move {
        while reloads.recv().await.is_some() {
            // Editors emit bursts of events for one save.
            tokio::time::sleep(RELOAD_DEBOUNCE).await;
            while reloads.try_recv().is_ok() {}
            kernel.reload().await;
        }
    });
    Ok(handle)
}

/// Run the kernel until a termination signal.
pub async fn run(settings: HostSettings) -> Result<(), StartupError> {
    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let Runtime {
        kernel,
        server,
        watcher: _watcher,
    } = build(&settings).await?;

    let listener = TcpListener::bind(&settings.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, origin = %settings.upstream.origin, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_shutdown_listener(shutdown.clone());
    signals::spawn_reload_on_hangup(kernel, &shutdown);

    server.run(listener, shutdown.wait()).await?;
    Ok(())
}
