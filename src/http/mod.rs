//! HTTP surface of the gateway.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (axum router: health route, catch-all gateway route)
//!     → handler.rs (readiness gate → playground / introspection / proxy)
//!     → admission.rs (paced budgets before each upstream attempt)
//!     → query engine
//! ```
//!
//! # Design Decisions
//! - Admission blocks instead of rejecting: bursts are paced, not 429'd
//! - Transient upstream failures retry a bounded number of times
//! - Callers only ever see an opaque 500; diagnostics stay in the logs

pub mod admission;
pub mod handler;
pub mod server;

pub use admission::RateBudget;
pub use server::HttpServer;
