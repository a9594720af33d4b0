//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscribed background task (health monitor,
//!     admin server, summary logger) observes the broadcast and exits
//!
//! Signals (signals.rs):
//!     SIGINT / SIGTERM → resolve shutdown_signal() → daemon triggers Shutdown
//! ```
//!
//! # Design Decisions
//! - The health monitor owns a private Shutdown so it can be stopped on its own
//! - Stopping awaits the task; no work continues after stop returns

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
