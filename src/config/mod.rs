//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! kernel.toml (host settings, read once)
//!     → loader.rs (parse, fail fast)
//!
//! kernel configuration resource (JSON, remote or file)
//!     → loader.rs (fetch & deserialize, default on any failure)
//!     → validation.rs (semantic checks)
//!     → KernelConfig (validated, immutable)
//!     → shared via Arc to every request
//!
//! On reload (control message or file change via watcher.rs):
//!     → loader.rs loads new config
//!     → atomic swap of Arc<KernelConfig>
//!     → in-flight requests keep their snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{ConfigError, ConfigLoader, ConfigSource};
pub use schema::{
    HostSettings, KernelConfig, Mount, MountKind, PoolSize, Route, RouteTable, WorkerModule,
    WorkersConfig,
};
