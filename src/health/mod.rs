//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (monitor.rs):
//!     Periodic timer (or on-demand probe_all)
//!     → probe.rs: one JSON-RPC call per endpoint, bounded by its timeout
//!     → Update state.rs
//!
//! Operation outcomes (failover executor):
//!     Success / failure / throttling observed on a real call
//!     → Update state.rs
//!
//! State machine (state.rs):
//!     Available ←→ Unhealthy (failure threshold)
//!     Available ←→ RateLimited (cooldown)
//! ```
//!
//! # Design Decisions
//! - Probes and operations feed the same per-endpoint state
//! - Probes run sequentially; one slow endpoint delays the rest of the cycle
//! - A panicking probe counts as a failure, never as a monitor crash

pub mod monitor;
pub mod probe;
pub mod state;

pub use monitor::HealthMonitor;
pub use probe::{JsonRpcProbe, Probe};
pub use state::{EndpointState, EndpointStatus, HealthTransition};
