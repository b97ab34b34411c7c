//! Interception layer subsystem.
//!
//! # Data Flow
//! ```text
//! Absolute-form request (relay used as a forward proxy)
//!     → context.rs (InterceptedRequest, decide once)
//!     → dispatch.rs (Interceptor)
//!         ├─ Delegate      → engine.rs (RewriteEngine::fetch)
//!         ├─ ProxyRewrite  → decode /proxy/ target, strip credentials, add CORS
//!         └─ Passthrough   → forward unmodified
//!     → any failure → HTML error page (500)
//!
//! GET /proxy/<encoded url>
//!     → rewrite.rs (fetch page, rewrite root-relative links)
//! ```
//!
//! # Design Decisions
//! - The engine is a capability (init/route/fetch), not a base type
//! - The active routing context is an explicit object swapped atomically
//! - A new context takes over immediately, without waiting for reloads

pub mod context;
pub mod dispatch;
pub mod engine;
pub mod rewrite;

pub use context::{ContextState, InterceptedRequest, RoutingContext, RoutingDecision};
pub use dispatch::Interceptor;
pub use engine::{BareTransportEngine, NoopEngine, RewriteEngine};
pub use rewrite::{render_proxied_page, rewrite_root_relative, ProxiedPage};
