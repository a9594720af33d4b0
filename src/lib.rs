//! RPC endpoint failover manager.
//!
//! Keeps a process connected to a blockchain node through a set of
//! unreliable, rate-limited RPC providers: endpoints are ranked by priority,
//! tracked for health and throttling, and every caller operation is retried
//! on the next eligible endpoint when the current one fails.

pub mod admin;
pub mod config;
pub mod endpoint;
pub mod failover;
pub mod health;
pub mod lifecycle;
pub mod manager;
pub mod observability;
pub mod selection;
pub mod status;

pub use config::schema::{EndpointConfig, RpcConfig};
pub use endpoint::{Endpoint, EndpointRegistry, RegistryError};
pub use failover::{FailoverError, OperationError};
pub use lifecycle::Shutdown;
pub use manager::{ManagerError, RpcManager};
pub use status::StatusSummary;
