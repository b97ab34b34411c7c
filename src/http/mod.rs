//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, optional timeout)
//!     → absolute-form? → intercept::dispatch
//!     → /bare/*        → transport::bare
//!     → /proxy/*       → intercept::rewrite
//!     → otherwise 404
//!     → response.rs (error bodies, HTML documents)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRelayRequestId, X_REQUEST_ID};
pub use server::{build_router, AppState, RelayServer};
