//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check mount and route shapes
//! - Validate pool sizing and worker module names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: KernelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::KernelConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("mount #{index} has an empty {field}")]
    EmptyMountField { index: usize, field: &'static str },

    #[error("mount path '{0}' must start with '/'")]
    RelativeMountPath(String),

    #[error("route pattern '{0}' must start with '/'")]
    RelativeRoutePattern(String),

    #[error("route '{0}' has an empty file target")]
    EmptyRouteTarget(String),

    #[error("intercept pattern '{0}' must start with '/'")]
    RelativeInterceptPattern(String),

    #[error("workers.pool.min ({min}) exceeds workers.pool.max ({max})")]
    PoolBounds { min: usize, max: usize },

    #[error("worker module #{0} has an empty name")]
    EmptyModuleName(usize),

    #[error("worker module '{0}' is declared more than once")]
    DuplicateModule(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &KernelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, mount) in config.namespace.mounts.iter().enumerate() {
        if mount.path.is_empty() {
            errors.push(ValidationError::EmptyMountField { index, field: "path" });
        } else if !mount.path.starts_with('/') {
            errors.push(ValidationError::RelativeMountPath(mount.path.clone()));
        }
        if mount.target.is_empty() {
            errors.push(ValidationError::EmptyMountField { index, field: "target" });
        }
    }

    for route in config.routes.iter() {
        if !route.pattern.starts_with('/') {
            errors.push(ValidationError::RelativeRoutePattern(route.pattern.clone()));
        }
        if route.file.is_empty() {
            errors.push(ValidationError::EmptyRouteTarget(route.pattern.clone()));
        }
    }

    for pattern in &config.kernel.intercept_patterns {
        if !pattern.starts_with('/') {
            errors.push(ValidationError::RelativeInterceptPattern(pattern.clone()));
        }
    }

    let pool = config.workers.pool;
    if pool.min > pool.max {
        errors.push(ValidationError::PoolBounds { min: pool.min, max: pool.max });
    }

    let mut seen = HashSet::new();
    for (index, module) in config.workers.modules.iter().enumerate() {
        if module.name.is_empty() {
            errors.push(ValidationError::EmptyModuleName(index));
        } else if !seen.insert(module.name.as_str()) {
            errors.push(ValidationError::DuplicateModule(module.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Mount, MountKind, PoolSize, WorkerModule};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&KernelConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = KernelConfig::default();
        config.namespace.mounts.push(Mount {
            path: "assets".into(),
            target: String::new(),
            kind: MountKind::Dir,
        });
        config.workers.pool = PoolSize { min: 5, max: 1 };
        config.workers.modules = vec![
            WorkerModule { name: "a".into(), script: None },
            WorkerModule { name: "a".into(), script: None },
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::RelativeMountPath("assets".into())));
        assert!(errors.contains(&ValidationError::PoolBounds { min: 5, max: 1 }));
        assert!(errors.contains(&ValidationError::DuplicateModule("a".into())));
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::PoolBounds { min: 3, max: 2 };
        assert_eq!(err.to_string(), "workers.pool.min (3) exceeds workers.pool.max (2)");
    }
}
