//! Control protocol.
//!
//! # Data Flow
//! ```text
//! {"type": ...} + one-shot reply channel
//!     → message.rs (parse into a command)
//!     → handler.rs (status from memory / reload / clear)
//!     → reply sent once
//! ```
//!
//! # Design Decisions
//! - Unrecognised types get an explicit failure reply so callers never hang
//! - RELOAD_CONFIG replies only after the new configuration is swapped in

pub mod handler;
pub mod message;

pub use handler::{handle_control, respond};
pub use message::{ControlError, ControlMessage, ControlReply, StatusReport};
