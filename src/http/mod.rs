//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → /__kernel/* → control.rs (control protocol, worker dispatch)
//!     → anything else → request.rs (buffer into a KernelRequest)
//!         → kernel pipeline
//!         → response.rs (KernelResponse back to the client)
//! ```

pub mod control;
pub mod request;
pub mod response;
pub mod server;

pub use request::{KernelRequest, X_REQUEST_ID};
pub use response::KernelResponse;
pub use server::{AppState, HttpServer};
