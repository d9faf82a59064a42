//! Pooled HTTP client with a fluent request builder

pub mod client;
pub mod config;
pub mod observability;
pub mod support;
pub mod transport;

pub use client::{ClientError, ClientResult, HttpMethod, RequestBuilder};
pub use config::schema::CourierConfig;
pub use transport::{acquire_shared_transport, init_shared_transports, TransportKind};
