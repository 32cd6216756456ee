//! Worker pool management.
//!
//! # Responsibilities
//! - Start `pool.min` generic workers plus one context per named module
//! - Hold every handle for the lifetime of the session
//! - Route dispatches to a worker by name
//!
//! # Design Decisions
//! - The pool never grows: `pool.max` is accepted but unused
//! - No per-worker teardown; contexts stop when the pool is dropped
//! - A module whose program is unknown is skipped, not fatal

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::config::schema::WorkersConfig;
use crate::workers::context::spawn_context;
use crate::workers::dispatcher::{WorkerHandle, WORKER_CALL_TIMEOUT};
use crate::workers::program::{ModuleRegistry, COMPUTE_PROGRAM};
use crate::workers::protocol::WorkerError;

/// Name of the `index`-th generic pool worker.
pub fn generic_worker_name(index: usize) -> String {
    format!("worker-{}", index)
}

/// Snapshot of one worker for status reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WorkerInfo {
    pub name: String,
    pub pending: usize,
}

/// The fixed set of worker contexts.
#[derive(Debug, Default)]
pub struct WorkerPool {
    enabled: bool,
    order: Vec<String>,
    handles: HashMap<String, WorkerHandle>,
}

impl WorkerPool {
    /// A pool with no workers that rejects every dispatch.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Start the pool described by `config`. Must run within a Tokio runtime.
    pub fn start(config: &WorkersConfig, registry: &ModuleRegistry) -> Result<Self, WorkerError> {
        Self::start_with_timeout(config, registry, WORKER_CALL_TIMEOUT)
    }

    /// As [`WorkerPool::start`] with a custom reply deadline.
    pub fn start_with_timeout(
        config: &WorkersConfig,
        registry: &ModuleRegistry,
        timeout: Duration,
    ) -> Result<Self, WorkerError> {
        if !config.enabled {
            tracing::info!("Workers disabled");
            return Ok(Self::disabled());
        }

        if config.pool.max > config.pool.min {
            tracing::warn!(
                min = config.pool.min,
                max = config.pool.max,
                "workers.pool.max is not used for growth; pool stays at min"
            );
        }

        let mut pool = Self {
            enabled: true,
            order: Vec::new(),
            handles: HashMap::new(),
        };

        for index in 0..config.pool.min {
            pool.spawn_worker(&generic_worker_name(index), COMPUTE_PROGRAM, registry, timeout)?;
        }

        for module in &config.modules {
            if pool.handles.contains_key(&module.name) {
                tracing::warn!(worker = %module.name, "Worker name already in use, skipping module");
                continue;
            }
            if !registry.contains(module.script_name()) {
                tracing::warn!(worker = %module.name, script = %module.script_name(), "Unknown worker program, skipping module");
                continue;
            }
            pool.spawn_worker(&module.name, module.script_name(), registry, timeout)?;
        }

        tracing::info!(workers = pool.order.len(), "Worker pool started");
        Ok(pool)
    }

    fn spawn_worker(
        &mut self,
        name: &str,
        program: &str,
        registry: &ModuleRegistry,
        timeout: Duration,
    ) -> Result<(), WorkerError> {
        let instance = registry.instantiate(program, name).ok_or_else(|| WorkerError::Spawn {
            name: name.to_string(),
            reason: format!("unknown program '{}'", program),
        })?;
        let channels = spawn_context(name, instance)?;
        self.handles
            .insert(name.to_string(), WorkerHandle::new(name, channels, timeout));
        self.order.push(name.to_string());
        tracing::debug!(worker = %name, program = %program, "Worker started");
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Worker names in creation order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&WorkerHandle> {
        self.handles.get(name)
    }

    /// Per-worker status in creation order.
    pub fn info(&self) -> Vec<WorkerInfo> {
        self.order
            .iter()
            .filter_map(|name| self.handles.get(name))
            .map(|handle| WorkerInfo {
                name: handle.name().to_string(),
                pending: handle.pending_count(),
            })
            .collect()
    }

    /// Send a message to the named worker and await its reply.
    pub async fn dispatch(&self, name: &str, kind: &str, payload: Value) -> Result<Value, WorkerError> {
        if !self.enabled {
            return Err(WorkerError::Disabled);
        }
        let handle = self
            .handles
            .get(name)
            .ok_or_else(|| WorkerError::UnknownWorker(name.to_string()))?;
        handle.call(kind, payload).await
    }
}
