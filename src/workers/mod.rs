//! Worker subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch(worker, type, payload)
//!     → pool.rs (look up worker by name)
//!     → dispatcher.rs (new correlation id, pending entry, 5000 ms deadline)
//!     → context.rs (isolated thread runs the program from program.rs)
//!     → reply {id, result | error} → matching pending entry resolved
//! ```
//!
//! # Design Decisions
//! - Contexts share nothing with the kernel; all traffic is messages
//! - Replies are matched by id only, never by arrival order
//! - Generic pool workers run the built-in `compute` program

pub mod compute;
pub mod context;
pub mod dispatcher;
pub mod pool;
pub mod program;
pub mod protocol;

pub use dispatcher::{WorkerHandle, WORKER_CALL_TIMEOUT};
pub use pool::{WorkerInfo, WorkerPool};
pub use program::{ModuleRegistry, TaskContext, WorkerProgram};
pub use protocol::{WorkerError, WorkerReply, WorkerRequest};
