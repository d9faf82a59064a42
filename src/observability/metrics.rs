//! Metrics collection.
//!
//! # Metrics
//! - `courier_requests_total` (counter): dispatches by transport, method, status
//! - `courier_request_duration_seconds` (histogram): dispatch latency by transport
//! - `courier_pool_buffers_idle` (gauge): response buffers parked in the object pool

use http::Method;
use std::time::Instant;

use crate::transport::TransportKind;

/// Record one finished dispatch. `status` is `None` when no response arrived.
pub fn record_dispatch(transport: TransportKind, method: &Method, status: Option<u16>, start: Instant) {
    let status = status
        .map(|code| code.to_string())
        .unwrap_or_else(|| "error".to_string());

    ::metrics::counter!(
        "courier_requests_total",
        "transport" => transport.as_str(),
        "method" => method.to_string(),
        "status" => status
    )
    .increment(1);

    ::metrics::histogram!(
        "courier_request_duration_seconds",
        "transport" => transport.as_str()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record the number of idle pooled response buffers.
pub fn record_pool_idle(idle: usize) {
    ::metrics::gauge!("courier_pool_buffers_idle").set(idle as f64);
}
