//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Triggers (idle expiry, fatal gateway error, Ctrl-C)
//!     → shutdown.rs (cancel the shared token, exactly once)
//!     → HTTP listener drains and closes
//!     → engine supervisor kills its child
//!     → main waits on the completion barrier, then exits
//! ```
//!
//! # Design Decisions
//! - One token is the single source of truth for "stop everything"
//! - Re-triggering is a no-op; every observer fires at most once
//! - In-flight HTTP requests drain; the child process is killed, not drained

pub mod idle;
pub mod shutdown;

pub use idle::{ActivitySignal, IdleTimer};
pub use shutdown::Shutdown;
