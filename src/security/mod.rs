//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request headers
//!     → headers.rs (drop host/origin/referer, fixed user-agent)
//!     → forwarded upstream
//!
//! Upstream response headers
//!     → headers.rs (drop framing fields, add CORS allow-all)
//!     → relayed to client
//! ```

pub mod headers;
