//! Isolated worker execution contexts.
//!
//! Each context is a dedicated OS thread owning its program. Tasks arrive on
//! an inbound channel and replies leave on an outbound one; nothing else is
//! shared with the kernel or with other contexts. The thread exits when the
//! inbound channel closes.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;

use tokio::sync::mpsc;

use crate::workers::program::{TaskContext, WorkerProgram};
use crate::workers::protocol::{Task, WorkerError, WorkerReply};

/// The kernel-side ends of a running context.
pub struct ContextChannels {
    pub tasks: mpsc::UnboundedSender<Task>,
    pub replies: mpsc::UnboundedReceiver<WorkerReply>,
}

/// Start a context running `program` on its own thread.
pub fn spawn_context(name: &str, mut program: Box<dyn WorkerProgram>) -> Result<ContextChannels, WorkerError> {
    let (task_tx, mut task_rx) = mpsc::unbounded_channel::<Task>();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel::<WorkerReply>();
    let worker = name.to_string();

    thread::Builder::new()
        .name(format!("kernel-worker-{}", name))
        .spawn(move || {
            tracing::debug!(worker = %worker, "Worker context started");

            while let Some(task) = task_rx.blocking_recv() {
                let id = task.request.id.clone();
                if task.cancel.is_cancelled() {
                    tracing::debug!(worker = %worker, id = %id, "Skipping task cancelled before start");
                    continue;
                }

                let ctx = TaskContext {
                    worker: &worker,
                    cancel: &task.cancel,
                };
                let outcome = catch_unwind(AssertUnwindSafe(|| program.handle(&task.request, &ctx)))
                    .unwrap_or_else(|_| Some(Err(format!("Worker '{}' panicked", worker))));

                let reply = match outcome {
                    Some(Ok(result)) => WorkerReply::success(id, result),
                    Some(Err(message)) => WorkerReply::failure(id, message),
                    None => continue,
                };
                if reply_tx.send(reply).is_err() {
                    break;
                }
            }

            tracing::debug!(worker = %worker, "Worker context stopped");
        })
        .map_err(|e| WorkerError::Spawn {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

    Ok(ContextChannels {
        tasks: task_tx,
        replies: reply_rx,
    })
}
