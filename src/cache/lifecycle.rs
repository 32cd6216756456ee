//! Cache generations.
//!
//! Cache namespaces are named `<prefix>-v<version>`. Activation deletes every
//! namespace carrying the prefix except the running version's; this is the
//! only automatic eviction. A manual clear drops the running version's
//! namespace and nothing else.

use std::sync::Arc;

use crate::cache::store::{CacheNamespace, CacheStorage};
use crate::observability::metrics;

/// Names, purges and clears versioned caches.
#[derive(Debug, Clone)]
pub struct CacheLifecycle {
    storage: CacheStorage,
    prefix: String,
    current: String,
}

impl CacheLifecycle {
    pub fn new(storage: CacheStorage, prefix: impl Into<String>, version: &str) -> Self {
        let prefix = prefix.into();
        let current = cache_name(&prefix, version);
        Self {
            storage,
            prefix,
            current,
        }
    }

    /// Name of the running version's namespace.
    pub fn current_name(&self) -> &str {
        &self.current
    }

    /// The running version's namespace, created on demand.
    pub fn current(&self) -> Arc<CacheNamespace> {
        self.storage.open(&self.current)
    }

    /// Entries stored for the running version.
    pub fn entry_count(&self) -> usize {
        self.storage.get(&self.current).map_or(0, |ns| ns.len())
    }

    /// Delete every prefixed namespace other than the running version's.
    /// Returns the deleted names.
    pub fn activate(&self) -> Vec<String> {
        let mut purged = Vec::new();
        for name in self.storage.names() {
            if self.owns(&name) && name != self.current && self.storage.delete(&name) {
                tracing::info!(cache = %name, "Purged stale cache generation");
                purged.push(name);
            }
        }
        metrics::record_cache_purged(purged.len());
        tracing::info!(current = %self.current, purged = purged.len(), "Cache lifecycle activated");
        purged
    }

    /// Delete the running version's namespace. Returns true if it existed.
    pub fn clear(&self) -> bool {
        let existed = self.storage.delete(&self.current);
        tracing::info!(cache = %self.current, existed, "Cache cleared");
        existed
    }

    fn owns(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.starts_with("-v"))
    }
}

/// `<prefix>-v<version>`.
pub fn cache_name(prefix: &str, version: &str) -> String {
    format!("{}-v{}", prefix, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::KernelResponse;
    use axum::http::StatusCode;

    #[test]
    fn test_cache_name() {
        assert_eq!(cache_name("kernel", "1.2.0"), "kernel-v1.2.0");
    }

    #[test]
    fn test_activate_purges_only_stale_prefixed_caches() {
        let storage = CacheStorage::new();
        for name in ["kernel-v0.9.0", "kernel-v1.0.0", "kernel-v1.1.0", "other-v0.1.0", "kernelish"] {
            storage.open(name);
        }

        let lifecycle = CacheLifecycle::new(storage.clone(), "kernel", "1.1.0");
        let mut purged = lifecycle.activate();
        purged.sort();
        assert_eq!(purged, vec!["kernel-v0.9.0".to_string(), "kernel-v1.0.0".to_string()]);

        let mut remaining = storage.names();
        remaining.sort();
        assert_eq!(
            remaining,
            vec!["kernel-v1.1.0".to_string(), "kernelish".to_string(), "other-v0.1.0".to_string()]
        );
    }

    #[test]
    fn test_clear_only_touches_current() {
        let storage = CacheStorage::new();
        storage.open("kernel-v0.1.0");
        let lifecycle = CacheLifecycle::new(storage.clone(), "kernel", "0.2.0");
        lifecycle
            .current()
            .put("GET /a", KernelResponse::new(StatusCode::OK, "a"));
        assert_eq!(lifecycle.entry_count(), 1);

        assert!(lifecycle.clear());
        assert_eq!(lifecycle.entry_count(), 0);
        assert!(storage.get("kernel-v0.1.0").is_some());
        assert!(!lifecycle.clear());
    }
}
