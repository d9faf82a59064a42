//! Process-wide shared transports.
//!
//! # Responsibilities
//! - Build each transport strategy at most once per process, on first use
//! - Fix the tuning used for that construction
//!
//! # Design Decisions
//! - `OnceCell` serializes racing first callers; losers observe the winner's
//!   instance, so two pools are never created
//! - Shared transports are never torn down

use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::config::TransportConfig;
use crate::transport::error::TransportResult;
use crate::transport::pooled::PooledTransport;
use crate::transport::standard::StandardTransport;
use crate::transport::{SharedTransport, TransportKind};

static TUNING: OnceCell<TransportConfig> = OnceCell::new();
static STANDARD: OnceCell<Arc<StandardTransport>> = OnceCell::new();
static POOLED: OnceCell<Arc<PooledTransport>> = OnceCell::new();

/// Set the tuning used when the shared transports are first built.
///
/// Returns false when tuning was already fixed, either by an earlier call or
/// because a shared transport has been built with the defaults.
pub fn init_shared_transports(config: TransportConfig) -> bool {
    let applied = TUNING.set(config).is_ok();
    if !applied {
        tracing::debug!("Shared transport tuning already fixed, ignoring new values");
    }
    applied
}

fn tuning() -> &'static TransportConfig {
    TUNING.get_or_init(TransportConfig::default)
}

/// Get the process-wide transport for `kind`, building it on first use.
pub fn acquire_shared_transport(kind: TransportKind) -> TransportResult<SharedTransport> {
    let transport: SharedTransport = match kind {
        TransportKind::Standard => STANDARD
            .get_or_try_init(|| StandardTransport::new(tuning().standard.clone()).map(Arc::new))?
            .clone(),
        TransportKind::Pooled => POOLED
            .get_or_init(|| Arc::new(PooledTransport::new(tuning().pooled.clone())))
            .clone(),
    };
    Ok(transport)
}
