//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Intercepted request path
//!     → router.rs (exact lookup, then ordered pattern scan)
//!     → matcher.rs (wildcard → anchored regex)
//!     → Return: RouteMatch or None
//!
//! Route Compilation (per configuration):
//!     RouteTable (declaration order)
//!     → Compile wildcard patterns
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled once per configuration, immutable at runtime
//! - Deterministic: same input always matches same route
//! - Exact keys beat patterns; first-declared pattern wins

pub mod matcher;
pub mod router;

pub use matcher::{PatternSet, WildcardPattern};
pub use router::{MatchKind, RouteMatch, Router};
