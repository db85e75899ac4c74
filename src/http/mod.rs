//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, trace + timeout layers)
//!     → POST /invoke   → InvocationHandler → {status_code, body}
//!     → GET  /health   → liveness and version
//!     → GET  /circuits → circuit breaker overview
//! ```

pub mod server;

pub use server::{build_router, AppState, HttpServer};
