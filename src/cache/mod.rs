//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! Request not handled by a route or mount
//!     → strategy.rs (cache-first / network-first / stale-while-revalidate)
//!     → lifecycle.rs (running version's namespace)
//!     → store.rs (concurrent namespace → entry maps)
//!
//! Kernel activation:
//!     lifecycle.rs purges every other `<prefix>-v*` namespace
//! ```
//!
//! # Design Decisions
//! - No LRU, no TTL: generations are the only eviction policy
//! - Entries are re-derivable, so concurrent overwrites need no locking
//!   beyond the map's own sharding

pub mod lifecycle;
pub mod store;
pub mod strategy;

pub use lifecycle::{cache_name, CacheLifecycle};
pub use store::{CacheNamespace, CacheStorage};
pub use strategy::{CachingStrategy, StrategyEngine};
