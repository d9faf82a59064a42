//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CourierConfig (validated, read-only)
//!     → transport tuning handed to the shared transport provider once
//!     → api.rs builds the endpoint catalog
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Transport tuning is fixed after the first shared transport is built

pub mod api;
pub mod loader;
pub mod schema;
pub mod validation;

pub use api::ApiCatalog;
pub use loader::{load_config, ConfigError};
pub use schema::{
    ApiConfig, ApiEndpoint, CourierConfig, LoggingConfig, PooledTransportConfig, RequestDefaults,
    StandardTransportConfig, TransportConfig,
};
pub use validation::{validate_config, ValidationError};
