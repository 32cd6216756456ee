//! Interception kernel server.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                INTERCEPTION KERNEL                │
//!   Hosted app        │  ┌────────┐   ┌─────────┐   ┌───────────┐        │
//!  ───────────────────┼─▶│  http  │──▶│ routing │──▶│ namespace │        │
//!                     │  │ server │   └────┬────┘   └─────┬─────┘        │
//!                     │  └───┬────┘        │              │              │
//!                     │      │             ▼              ▼              │
//!                     │      │        ┌─────────────────────────┐        │      Upstream
//!                     │      │        │ cache strategies + store │───────┼────▶ origin
//!                     │      │        └─────────────────────────┘        │
//!                     │      ▼                                           │
//!                     │  ┌─────────┐   ┌─────────────────────────┐      │
//!                     │  │ control │   │ worker pool (threads)   │      │
//!                     │  └─────────┘   └─────────────────────────┘      │
//!                     └──────────────────────────────────────────────────┘
//! ```
//!
//! Host settings come from the TOML file named by `KERNEL_SETTINGS`
//! (default `kernel.toml`); a missing file means defaults.

use std::path::PathBuf;

use intercept_kernel::config::loader::load_host_settings;
use intercept_kernel::lifecycle::startup;
use intercept_kernel::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings_path = std::env::var_os("KERNEL_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("kernel.toml"));
    let settings = load_host_settings(&settings_path)?;

    logging::init_logging(&settings.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), settings = %settings_path.display(), "intercept-kernel starting");

    startup::run(settings).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
