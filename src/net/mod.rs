//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Kernel decides to fetch
//!     → fetcher.rs (Fetcher trait: KernelRequest → KernelResponse)
//!     → upstream.rs (hyper client against the upstream origin)
//! ```
//!
//! # Design Decisions
//! - Non-2xx responses are results, not errors; only transport failures fail
//! - Response bodies are buffered so they can be cached

pub mod fetcher;
pub mod upstream;

pub use fetcher::{FetchError, Fetcher};
pub use upstream::UpstreamFetcher;
