//! Middleware for the Media Broker.
//!
//! - `http_metrics` - HTTP request metrics for every response
//! - `error_envelope` - failed envelopes for framework-level errors

pub mod error_envelope;
pub mod http_metrics;

pub use error_envelope::error_envelope_middleware;
pub use http_metrics::http_metrics_middleware;
