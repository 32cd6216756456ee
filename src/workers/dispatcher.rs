//! Correlated request/response dispatch to a worker.
//!
//! # Responsibilities
//! - Assign each call a fresh correlation id
//! - Track one pending entry per in-flight call
//! - Resolve on the matching reply, reject on worker error or deadline
//!
//! # Design Decisions
//! - A pending entry is removed exactly once, by whichever of reply or
//!   deadline gets to the map first (`DashMap::remove` is the arbiter)
//! - On deadline the call's cancellation token fires so the worker can stop;
//!   a reply that still arrives finds no entry and is dropped
//! - A caller dropping its future also removes and cancels its entry

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::observability::metrics;
use crate::workers::context::ContextChannels;
use crate::workers::protocol::{Task, WorkerError, WorkerReply, WorkerRequest};

/// Deadline for a worker reply.
pub const WORKER_CALL_TIMEOUT: Duration = Duration::from_millis(5000);

struct PendingCall {
    reply: oneshot::Sender<Result<Value, WorkerError>>,
    cancel: CancellationToken,
    deadline: Instant,
}

type PendingMap = Arc<DashMap<String, PendingCall>>;

/// Kernel-side handle to one worker context.
#[derive(Clone)]
pub struct WorkerHandle {
    name: String,
    tasks: mpsc::UnboundedSender<Task>,
    pending: PendingMap,
    timeout: Duration,
}

impl WorkerHandle {
    /// Wrap a running context and start routing its replies.
    /// Must be called within a Tokio runtime.
    pub fn new(name: &str, channels: ContextChannels, timeout: Duration) -> Self {
        let pending: PendingMap = Arc::new(DashMap::new());
        tokio::spawn(route_replies(name.to_string(), channels.replies, Arc::clone(&pending)));

        Self {
            name: name.to_string(),
            tasks: channels.tasks,
            pending,
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Send `{type, payload, id}` and wait for the matching reply.
    pub async fn call(&self, kind: impl Into<String>, payload: Value) -> Result<Value, WorkerError> {
        let id = Uuid::new_v4().to_string();
        let (reply_tx, mut reply_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        self.pending.insert(
            id.clone(),
            PendingCall {
                reply: reply_tx,
                cancel: cancel.clone(),
                deadline: Instant::now() + self.timeout,
            },
        );
        let _guard = PendingGuard {
            pending: &self.pending,
            id: &id,
        };

        let task = Task {
            request: WorkerRequest {
                kind: kind.into(),
                payload,
                id: id.clone(),
            },
            cancel,
        };
        if self.tasks.send(task).is_err() {
            metrics::record_worker_call(&self.name, "disconnected");
            return Err(WorkerError::Disconnected(self.name.clone()));
        }

        let outcome = match tokio::time::timeout(self.timeout, &mut reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(WorkerError::Disconnected(self.name.clone())),
            Err(_) => match self.pending.remove(&id) {
                Some((_, call)) => {
                    call.cancel.cancel();
                    tracing::warn!(worker = %self.name, id = %id, "Worker call timed out");
                    Err(WorkerError::Timeout {
                        worker: self.name.clone(),
                        millis: self.timeout.as_millis() as u64,
                    })
                }
                None => self.claimed_reply(reply_rx).await,
            },
        };

        metrics::record_worker_call(&self.name, outcome_label(&outcome));
        outcome
    }

    /// The reply router removed the entry at the deadline; its send follows.
    async fn claimed_reply(&self, reply_rx: oneshot::Receiver<Result<Value, WorkerError>>) -> Result<Value, WorkerError> {
        reply_rx
            .await
            .unwrap_or_else(|_| Err(WorkerError::Disconnected(self.name.clone())))
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("name", &self.name)
            .field("pending", &self.pending.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Removes and cancels a call's entry if the caller goes away early.
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some((_, call)) = self.pending.remove(self.id) {
            call.cancel.cancel();
        }
    }
}

async fn route_replies(worker: String, mut replies: mpsc::UnboundedReceiver<WorkerReply>, pending: PendingMap) {
    while let Some(reply) = replies.recv().await {
        match pending.remove(&reply.id) {
            Some((id, call)) => {
                if Instant::now() > call.deadline {
                    tracing::debug!(worker = %worker, id = %id, "Reply arrived at the deadline");
                }
                let _ = call.reply.send(reply.into_result());
            }
            None => {
                tracing::debug!(worker = %worker, id = %reply.id, "Discarding late reply");
            }
        }
    }

    // Context gone: fail whatever is still waiting.
    let orphaned: Vec<String> = pending.iter().map(|r| r.key().clone()).collect();
    for id in orphaned {
        if let Some((_, call)) = pending.remove(&id) {
            let _ = call.reply.send(Err(WorkerError::Disconnected(worker.clone())));
        }
    }
    tracing::debug!(worker = %worker, "Reply router stopped");
}

fn outcome_label(outcome: &Result<Value, WorkerError>) -> &'static str {
    match outcome {
        Ok(_) => "ok",
        Err(WorkerError::Timeout { .. }) => "timeout",
        Err(WorkerError::Failed(_)) => "error",
        Err(_) => "disconnected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::context::spawn_context;
    use crate::workers::program::{TaskContext, WorkerProgram};
    use serde_json::json;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex;

    struct Echo;

    impl WorkerProgram for Echo {
        fn handle(&mut self, request: &WorkerRequest, _ctx: &TaskContext<'_>) -> Option<Result<Value, String>> {
            match request.kind.as_str() {
                "FAIL" => Some(Err("Division by zero".into())),
                "SILENT" => None,
                _ => Some(Ok(request.payload.clone())),
            }
        }
    }

    /// Blocks each task until the test opens the gate.
    struct Gated {
        gate: Mutex<std_mpsc::Receiver<()>>,
    }

    impl WorkerProgram for Gated {
        fn handle(&mut self, request: &WorkerRequest, _ctx: &TaskContext<'_>) -> Option<Result<Value, String>> {
            let _ = self.gate.lock().unwrap().recv();
            Some(Ok(request.payload.clone()))
        }
    }

    fn handle_for(program: Box<dyn WorkerProgram>, timeout: Duration) -> WorkerHandle {
        let channels = spawn_context("test", program).unwrap();
        WorkerHandle::new("test", channels, timeout)
    }

    #[tokio::test]
    async fn test_call_resolves_with_result() {
        let handle = handle_for(Box::new(Echo), WORKER_CALL_TIMEOUT);
        let result = handle.call("ECHO", json!({"a": 1})).await.unwrap();
        assert_eq!(result, json!({"a": 1}));
        assert_eq!(handle.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_worker_error_rejects_with_message() {
        let handle = handle_for(Box::new(Echo), WORKER_CALL_TIMEOUT);
        let err = handle.call("FAIL", Value::Null).await.unwrap_err();
        assert_eq!(err, WorkerError::Failed("Division by zero".into()));
        assert_eq!(err.to_string(), "Division by zero");
        assert_eq!(handle.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_correlate() {
        let handle = handle_for(Box::new(Echo), WORKER_CALL_TIMEOUT);
        let calls = (0..20).map(|i| {
            let handle = handle.clone();
            async move { handle.call("ECHO", json!(i)).await }
        });
        let results = futures_util::future::join_all(calls).await;
        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap(), json!(i));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_worker_times_out_after_deadline() {
        let handle = handle_for(Box::new(Echo), WORKER_CALL_TIMEOUT);
        let start = Instant::now();
        let err = handle.call("SILENT", Value::Null).await.unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(5000));
        assert_eq!(
            err,
            WorkerError::Timeout {
                worker: "test".into(),
                millis: 5000
            }
        );
        assert_eq!(handle.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_late_reply_is_discarded() {
        let (open, gate) = std_mpsc::channel();
        let handle = handle_for(
            Box::new(Gated { gate: Mutex::new(gate) }),
            Duration::from_millis(200),
        );

        let err = handle.call("SLOW", json!("late")).await.unwrap_err();
        assert!(matches!(err, WorkerError::Timeout { .. }));
        assert_eq!(handle.pending_count(), 0);

        // Release the abandoned task and the next one; the late reply must
        // not satisfy the new call.
        open.send(()).unwrap();
        open.send(()).unwrap();
        let next = handle.call("NEXT", json!("fresh")).await;
        assert_eq!(next.unwrap(), json!("fresh"));
        assert_eq!(handle.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_reply_claimed_at_deadline_is_delivered() {
        let handle = handle_for(Box::new(Echo), WORKER_CALL_TIMEOUT);
        let (reply_tx, reply_rx) = oneshot::channel();

        // Entry already removed by the router, send not yet made.
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = reply_tx.send(Ok(json!("on time")));
        });
        let result = handle.claimed_reply(reply_rx).await;
        assert_eq!(result.unwrap(), json!("on time"));

        let (reply_tx, reply_rx) = oneshot::channel::<Result<Value, WorkerError>>();
        drop(reply_tx);
        let err = handle.claimed_reply(reply_rx).await.unwrap_err();
        assert_eq!(err, WorkerError::Disconnected("test".into()));
    }

    #[tokio::test]
    async fn test_dropped_caller_removes_entry() {
        let (_open, gate) = std_mpsc::channel::<()>();
        let handle = handle_for(Box::new(Gated { gate: Mutex::new(gate) }), WORKER_CALL_TIMEOUT);

        let call = handle.call("SLOW", Value::Null);
        let _ = tokio::time::timeout(Duration::from_millis(20), call).await;
        assert_eq!(handle.pending_count(), 0);
    }
}
