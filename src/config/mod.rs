//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or built-in defaults
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RpcConfig (validated, immutable)
//!     → active environment's EndpointConfig list → RpcManager registration
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; endpoints are registered once at startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod defaults;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, EndpointConfig, EnvironmentConfig, FailoverConfig, HealthCheckConfig,
    LogFormat, ObservabilityConfig, RpcConfig, SelectionMode,
};
pub use validation::{validate_config, validate_endpoint, ValidationError};
