//! Configuration schema definitions.
//!
//! Two documents are described here:
//! - [`KernelConfig`]: the JSON configuration resource consumed by the kernel
//!   (namespace, caching strategy, workers, routes). Reloadable at runtime.
//! - [`HostSettings`]: the TOML file describing how the process is hosted
//!   (listener, upstream origin, where the kernel configuration lives).
//!
//! All types derive Serde traits and default every missing field.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cache::strategy::CachingStrategy;

/// Root kernel configuration, loaded from the configuration resource.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct KernelConfig {
    /// Virtual namespace and its mounts.
    pub namespace: NamespaceConfig,

    /// Interception and caching behaviour.
    pub kernel: KernelSection,

    /// Worker pool settings.
    pub workers: WorkersConfig,

    /// Declared routes, in declaration order.
    pub routes: RouteTable,
}

/// Virtual namespace configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Root of the virtual namespace.
    pub root: String,

    /// Mount points, in declaration order.
    pub mounts: Vec<Mount>,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            root: "/".to_string(),
            mounts: Vec::new(),
        }
    }
}

/// A virtual-prefix to physical-prefix translation rule.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Mount {
    /// Virtual prefix matched against request paths.
    pub path: String,

    /// Physical prefix substituted for `path`.
    pub target: String,

    /// Mount kind.
    #[serde(rename = "type", default)]
    pub kind: MountKind,
}

/// Mount kind. Informational; both kinds resolve by prefix.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    #[default]
    Dir,
    File,
}

/// The `kernel` section of the configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct KernelSection {
    /// Strategy applied to requests not handled by a route or mount.
    pub caching_strategy: CachingStrategy,

    /// Wildcard patterns selecting which paths enter the pipeline.
    /// Empty means every path is intercepted.
    pub intercept_patterns: Vec<String>,

    /// Substitute `{path}` placeholders in route targets.
    pub route_templating: bool,
}

impl Default for KernelSection {
    fn default() -> Self {
        Self {
            caching_strategy: CachingStrategy::default(),
            intercept_patterns: vec!["/*".to_string()],
            route_templating: false,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct WorkersConfig {
    /// Create workers at startup.
    pub enabled: bool,

    /// Pool sizing.
    pub pool: PoolSize,

    /// Explicitly named worker modules, one isolated context each.
    pub modules: Vec<WorkerModule>,
}

/// Pool sizing. Only `min` is used; see the pool manager.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PoolSize {
    pub min: usize,
    pub max: usize,
}

impl Default for PoolSize {
    fn default() -> Self {
        Self { min: 2, max: 4 }
    }
}

/// A named worker module.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct WorkerModule {
    /// Worker name used for dispatch.
    pub name: String,

    /// Registry entry implementing the worker. Defaults to `name`.
    #[serde(default)]
    pub script: Option<String>,
}

impl WorkerModule {
    /// The registry key this module resolves to.
    pub fn script_name(&self) -> &str {
        self.script.as_deref().unwrap_or(&self.name)
    }
}

/// A declared route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Exact path or wildcard pattern (the key in the JSON object).
    pub pattern: String,

    /// Fetch target.
    pub file: String,

    /// Response header overrides.
    pub headers: BTreeMap<String, String>,
}

#[derive(Deserialize, Serialize)]
struct RouteBody {
    file: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
}

/// Routes keyed by pattern, preserving JSON declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable(Vec<Route>);

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self(routes)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Route> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for RouteTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RouteTableVisitor;

        impl<'de> Visitor<'de> for RouteTableVisitor {
            type Value = RouteTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of route patterns to route definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut routes: Vec<Route> = Vec::new();
                while let Some((pattern, body)) = map.next_entry::<String, RouteBody>()? {
                    // A repeated key replaces the earlier definition but keeps its position.
                    let route = Route {
                        pattern,
                        file: body.file,
                        headers: body.headers,
                    };
                    match routes.iter_mut().find(|r| r.pattern == route.pattern) {
                        Some(existing) => *existing = route,
                        None => routes.push(route),
                    }
                }
                Ok(RouteTable(routes))
            }
        }

        deserializer.deserialize_map(RouteTableVisitor)
    }
}

impl Serialize for RouteTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for route in &self.0 {
            map.serialize_entry(
                &route.pattern,
                &RouteBody {
                    file: route.file.clone(),
                    headers: route.headers.clone(),
                },
            )?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Host settings
// ---------------------------------------------------------------------------

/// Process-level settings, read once at startup.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HostSettings {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Upstream origin standing in for "the network".
    pub upstream: UpstreamConfig,

    /// Where and how the kernel configuration is found.
    pub kernel: KernelHostConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Request timeout for the whole pipeline in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to (e.g., "http://127.0.0.1:3000").
    pub origin: String,

    /// Per-fetch timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum response body buffered from the upstream.
    pub max_response_size: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:3000".to_string(),
            timeout_secs: 10,
            max_response_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Kernel hosting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KernelHostConfig {
    /// Path of the configuration resource on the upstream origin.
    pub config_resource: String,

    /// Local configuration file. Takes precedence over `config_resource`
    /// and enables hot reload on change.
    pub config_file: Option<String>,

    /// Fixed prefix of every cache namespace.
    pub cache_prefix: String,
}

impl Default for KernelHostConfig {
    fn default() -> Self {
        Self {
            config_resource: "/kernel.config.json".to_string(),
            config_file: None,
            cache_prefix: "intercept-kernel".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
