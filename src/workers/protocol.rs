//! Worker wire protocol.
//!
//! Request `{type, payload, id}`; reply `{id, result?, error?}`. The `id`
//! round-trips unchanged and is the only correlation mechanism.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Message sent to a worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    pub id: String,
}

/// Message sent back by a worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerReply {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerReply {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    /// An `error` field rejects the call even when `result` is also present.
    pub fn into_result(self) -> Result<Value, WorkerError> {
        match self.error {
            Some(message) => Err(WorkerError::Failed(message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A request plus the signal telling the worker the caller gave up.
#[derive(Debug)]
pub struct Task {
    pub request: WorkerRequest,
    pub cancel: CancellationToken,
}

/// Errors surfaced by worker dispatch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("workers are disabled")]
    Disabled,

    #[error("unknown worker '{0}'")]
    UnknownWorker(String),

    #[error("worker '{0}' is not running")]
    Disconnected(String),

    #[error("worker '{worker}' did not reply within {millis} ms")]
    Timeout { worker: String, millis: u64 },

    /// Error message reported by the worker itself.
    #[error("{0}")]
    Failed(String),

    #[error("failed to start worker '{name}': {reason}")]
    Spawn { name: String, reason: String },
}
