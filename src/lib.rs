//! Client-resident interception kernel.
//!
//! Intercepts resource requests, resolves them through a route table and a
//! virtual namespace, applies a caching strategy, and offers a control
//! protocol plus a pool of isolated workers.

pub mod cache;
pub mod config;
pub mod control;
pub mod http;
pub mod kernel;
pub mod lifecycle;
pub mod namespace;
pub mod net;
pub mod observability;
pub mod routing;
pub mod workers;

pub use config::schema::{HostSettings, KernelConfig};
pub use http::{HttpServer, KernelRequest, KernelResponse};
pub use kernel::{InstallOptions, Kernel};
pub use lifecycle::Shutdown;
