//! Blue-carbon registry backend.
//!
//! Serves the registry over a small Axum REST API backed by a flat JSON
//! record store. All record-keeping rules live in `registry_protocol`; this
//! crate adds persistence, HTTP mapping, rate limiting, export and a cached
//! client for the API.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod export;
pub mod rate_limit;
pub mod store;
