//! API Module
//!
//! HTTP handlers and routing for operating the cache.
//!
//! # Endpoints
//! - `PUT /set` - Store a value
//! - `GET /get/:namespace/:key` - Look a value up through the tiers
//! - `DELETE /del/:namespace/:key` - Delete a key from every tier
//! - `POST /clear` - Clear a namespace, a pattern or everything
//! - `GET /stats` - Per-tier statistics
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
