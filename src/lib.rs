//! Supervising GraphQL gateway for a local query engine.
//!
//! Fronts the engine's HTTP endpoint with paced admission, bounded retry,
//! introspection synthesis and idle shutdown; applies a one-shot schema
//! migration at boot; and supervises the engine subprocess, all stitched to
//! one shared cancellation signal.

pub mod config;
pub mod engine;
pub mod graphql;
pub mod http;
pub mod lifecycle;
pub mod migrate;

pub use config::Config;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
