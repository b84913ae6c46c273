//! Media Broker Library
//!
//! The Media Broker fronts a pool of media workers. It places each new
//! meeting on a worker in round-robin order, remembers that placement, and
//! routes every later operation for the meeting (join, transports,
//! producers, consumers, end) to the same worker.
//!
//! # Architecture
//!
//! The broker follows the Handler -> Service -> Repository pattern:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/session_router.rs
//!                                     -> services/worker_selection.rs
//!                                     -> repositories/meeting_affinity.rs
//!                                     -> services/worker_client.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Identifiers, worker handles, request bodies
//! - `observability` - Prometheus metrics
//! - `repositories` - Meeting affinity table
//! - `result` - Panic-safe result normalization and the JSON envelope
//! - `routes` - Axum router setup
//! - `services` - Worker selection, worker client, session routing

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod result;
pub mod routes;
pub mod services;
