//! Bare-transport relay library.

pub mod config;
pub mod http;
pub mod intercept;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod transport;

pub use config::RelayConfig;
pub use http::RelayServer;
pub use lifecycle::Shutdown;
