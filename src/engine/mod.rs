//! Query-engine subprocess lifecycle.
//!
//! # Data Flow
//! ```text
//! startup → preempt.rs (best-effort kill of a stale port owner)
//!         → supervisor.rs (spawn engine, park on the shutdown token)
//! shutdown token fires → kill child → supervisor task completes
//! ```
//!
//! # Design Decisions
//! - The child inherits stdout/stderr; its logs are the gateway's logs
//! - Preemption and kill failures are advisory, never escalated
//! - Spawn failure is a deployment error and aborts startup

pub mod preempt;
pub mod supervisor;

pub use preempt::PortPreempt;
pub use supervisor::run;
