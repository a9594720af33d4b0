//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry / selection / failover / health monitor produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every event carries the endpoint name as a structured field
//! - Each `execute` call runs in a span with its operation name and call id
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
