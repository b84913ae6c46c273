//! Observability for the Media Broker.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
