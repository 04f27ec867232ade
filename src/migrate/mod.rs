//! One-shot schema migration over the engine's JSON-RPC pipe.
//!
//! # Data Flow
//! ```text
//! schema text → digest ─┬─ matches persisted digest → skip, no subprocess
//!                       └─ differs → spawn engine
//!                              → write one schemaPush request line to stdin
//!                              → read one response line from stdout
//!                              → persist digest / log diagnostic
//! ```
//!
//! # Design Decisions
//! - The exchange is strictly one request line, one response line, per boot
//! - An engine-reported error is logged and non-fatal; the gateway still starts
//! - No verdict before the deadline persists the digest anyway (optimistic)
//! - Malformed responses and pipe failures abort startup

mod applier;
mod lock;

pub use applier::{apply, MigrateError, MigrationOutcome};
pub use lock::SchemaDigest;
