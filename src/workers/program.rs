//! Worker programs and the registry that names them.
//!
//! A program is the code running inside one isolated worker context. It owns
//! its state exclusively; the kernel only ever reaches it through messages.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::workers::compute::ComputeProgram;
use crate::workers::protocol::WorkerRequest;

/// Registry key of the built-in program used by generic pool workers.
pub const COMPUTE_PROGRAM: &str = "compute";

/// Per-task view handed to a program.
#[derive(Debug)]
pub struct TaskContext<'a> {
    pub worker: &'a str,
    pub cancel: &'a CancellationToken,
}

impl TaskContext<'_> {
    /// True once the caller has given up on this task.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Code executed by a worker context.
pub trait WorkerProgram: Send + 'static {
    /// Handle one message. `None` sends no reply at all.
    fn handle(&mut self, request: &WorkerRequest, ctx: &TaskContext<'_>) -> Option<Result<Value, String>>;
}

type ProgramFactory = Arc<dyn Fn(&str) -> Box<dyn WorkerProgram> + Send + Sync>;

/// Maps program names to factories. The factory receives the worker name.
#[derive(Clone)]
pub struct ModuleRegistry {
    factories: HashMap<String, ProgramFactory>,
}

impl ModuleRegistry {
    /// Registry with no programs.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register (or replace) a program.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str) -> Box<dyn WorkerProgram> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Instantiate a program for a worker.
    pub fn instantiate(&self, program: &str, worker: &str) -> Option<Box<dyn WorkerProgram>> {
        self.factories.get(program).map(|factory| factory(worker))
    }

    pub fn contains(&self, program: &str) -> bool {
        self.factories.contains_key(program)
    }
}

impl Default for ModuleRegistry {
    /// Registry with the built-in `compute` program.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(COMPUTE_PROGRAM, |worker| Box::new(ComputeProgram::new(worker)));
        registry
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ModuleRegistry").field("programs", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl WorkerProgram for Echo {
        fn handle(&mut self, request: &WorkerRequest, _ctx: &TaskContext<'_>) -> Option<Result<Value, String>> {
            Some(Ok(request.payload.clone()))
        }
    }

    #[test]
    fn test_default_registry_has_compute() {
        let registry = ModuleRegistry::default();
        assert!(registry.contains(COMPUTE_PROGRAM));
        assert!(registry.instantiate("missing", "w").is_none());
    }

    #[test]
    fn test_register_and_instantiate() {
        let mut registry = ModuleRegistry::empty();
        registry.register("echo", |_| Box::new(Echo));
        let mut program = registry.instantiate("echo", "w").unwrap();

        let cancel = CancellationToken::new();
        let ctx = TaskContext { worker: "w", cancel: &cancel };
        let request = WorkerRequest {
            kind: "ANY".into(),
            payload: Value::from(7),
            id: "1".into(),
        };
        assert_eq!(program.handle(&request, &ctx), Some(Ok(Value::from(7))));
        assert!(!ctx.is_cancelled());
    }
}
