//! Bare transport subsystem.
//!
//! # Data Flow
//! ```text
//! ANY /bare/<encoded url>
//!     → url.rs (decode + validate target)
//!     → security::headers (sanitize request)
//!     → forwarder.rs (one outbound request, redirects followed)
//!     → security::headers (sanitize response)
//!     → body streamed back to the client
//!
//! Client side:
//!     client.rs (BareClient) → <relay>/bare/<encoded url>
//! ```
//!
//! # Design Decisions
//! - Every failure ends only the request that caused it
//! - No retries; callers decide whether to try again
//! - Bodies are streamed in both directions

pub mod bare;
pub mod client;
pub mod error;
pub mod forwarder;
pub mod url;

pub use client::BareClient;
pub use error::{RelayError, RelayResult};
pub use forwarder::{ForwardResult, Forwarder, HttpForwarder, OutboundRequest};
