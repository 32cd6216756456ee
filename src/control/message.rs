//! Control messages and replies.
//!
//! Requests are `{"type": "KERNEL_STATUS" | "RELOAD_CONFIG" | "CLEAR_CACHE"}`.
//! Extra fields are ignored. Anything else is answered with
//! `{"success": false, "error": ...}`.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::schema::KernelConfig;

/// A recognised control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    KernelStatus,
    ReloadConfig,
    ClearCache,
}

impl ControlMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KernelStatus => "KERNEL_STATUS",
            Self::ReloadConfig => "RELOAD_CONFIG",
            Self::ClearCache => "CLEAR_CACHE",
        }
    }

    /// Read the command from a raw message.
    pub fn parse(raw: &Value) -> Result<Self, ControlError> {
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ControlError::MissingType)?;

        match kind {
            "KERNEL_STATUS" => Ok(Self::KernelStatus),
            "RELOAD_CONFIG" => Ok(Self::ReloadConfig),
            "CLEAR_CACHE" => Ok(Self::ClearCache),
            other => Err(ControlError::UnknownType(other.to_string())),
        }
    }
}

/// Why a control message could not be handled.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("control message has no string 'type' field")]
    MissingType,

    #[error("Unknown control message type: {0}")]
    UnknownType(String),
}

/// In-memory kernel state reported by `KERNEL_STATUS`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub version: String,
    pub config: KernelConfig,
    pub active: bool,
    /// Running cache namespace.
    pub cache: String,
    pub cache_entries: usize,
    pub workers: Vec<String>,
}

/// Reply sent over the caller's one-shot channel.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ControlReply {
    Status(Box<StatusReport>),
    Outcome {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ControlReply {
    pub fn success() -> Self {
        Self::Outcome {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Outcome {
            success: false,
            error: Some(error.into()),
        }
    }

    /// False only for an explicit failure reply.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Status(_) => true,
            Self::Outcome { success, .. } => *success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_types() {
        assert_eq!(ControlMessage::parse(&json!({"type": "KERNEL_STATUS"})).unwrap(), ControlMessage::KernelStatus);
        assert_eq!(ControlMessage::parse(&json!({"type": "RELOAD_CONFIG", "extra": 1})).unwrap(), ControlMessage::ReloadConfig);
        assert_eq!(ControlMessage::parse(&json!({"type": "CLEAR_CACHE"})).unwrap(), ControlMessage::ClearCache);
    }

    #[test]
    fn test_parse_rejects_unknown_and_missing() {
        assert_eq!(
            ControlMessage::parse(&json!({"type": "SHUTDOWN"})).unwrap_err(),
            ControlError::UnknownType("SHUTDOWN".into())
        );
        assert_eq!(ControlMessage::parse(&json!({"kind": "x"})).unwrap_err(), ControlError::MissingType);
        assert_eq!(ControlMessage::parse(&json!({"type": 7})).unwrap_err(), ControlError::MissingType);
    }

    #[test]
    fn test_reply_shapes() {
        assert_eq!(serde_json::to_value(ControlReply::success()).unwrap(), json!({"success": true}));
        assert_eq!(
            serde_json::to_value(ControlReply::failure("nope")).unwrap(),
            json!({"success": false, "error": "nope"})
        );

        let status = ControlReply::Status(Box::new(StatusReport {
            version: "0.1.0".into(),
            config: KernelConfig::default(),
            active: true,
            cache: "intercept-kernel-v0.1.0".into(),
            cache_entries: 0,
            workers: vec![],
        }));
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["version"], "0.1.0");
        assert_eq!(value["active"], true);
        assert_eq!(value["cacheEntries"], 0);
        assert!(value["config"]["kernel"].is_object());
        assert!(status.is_success());
    }
}
