//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Builder, dispatcher and transports produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms, gauges via the metrics facade)
//!
//! Consumers:
//!     → whatever subscriber / recorder the host process installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a metrics recorder; without one the calls are no-ops
//! - Logging setup is idempotent so tests and embedding processes can call it freely

pub mod logging;
pub mod metrics;
