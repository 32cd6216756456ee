//! Control message handling.
//!
//! Each message is answered exactly once over the caller's one-shot channel.
//! A caller that stopped waiting simply never sees the reply.

use serde_json::Value;
use tokio::sync::oneshot;

use crate::control::message::{ControlMessage, ControlReply};
use crate::kernel::Kernel;

/// Handle one raw control message and send the reply.
pub async fn handle_control(kernel: &Kernel, raw: Value, reply: oneshot::Sender<ControlReply>) {
    let response = respond(kernel, &raw).await;
    if reply.send(response).is_err() {
        tracing::debug!("Control caller went away before the reply");
    }
}

/// Compute the reply for a raw control message.
pub async fn respond(kernel: &Kernel, raw: &Value) -> ControlReply {
    let message = match ControlMessage::parse(raw) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(raw = %raw, error = %e, "Rejected control message");
            return ControlReply::failure(e.to_string());
        }
    };

    tracing::info!(command = message.as_str(), "Control message received");
    match message {
        ControlMessage::KernelStatus => ControlReply::Status(Box::new(kernel.status())),
        ControlMessage::ReloadConfig => {
            kernel.reload().await;
            ControlReply::success()
        }
        ControlMessage::ClearCache => {
            kernel.clear_cache();
            ControlReply::success()
        }
    }
}
