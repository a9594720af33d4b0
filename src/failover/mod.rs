//! Failover subsystem.
//!
//! # Data Flow
//! ```text
//! caller operation (async closure)
//!     → executor.rs (select → admit → run under timeout)
//!     → error.rs classification (rate limit / transient / fatal)
//!     → endpoint state update, sticky pointer update
//!     → backoff.rs (optional delay) → next endpoint, or return
//! ```
//!
//! # Design Decisions
//! - An endpoint is tried at most once per call
//! - Local admission refusals never count against the endpoint
//! - Fatal errors belong to the caller and propagate immediately

pub mod backoff;
pub mod error;
pub mod executor;

pub use error::{AttemptFailure, AttemptRecord, ErrorClass, FailoverError, OperationError};
pub use executor::FailoverExecutor;
