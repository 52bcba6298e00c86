//! API Module
//!
//! HTTP handlers and routing for the cache admin API, used by deployment
//! tooling to invalidate artifacts.
//!
//! # Endpoints
//! - `POST /invalidate` - Invalidate an artifact locally and at the edge
//! - `POST /flush` - Flush the whole accelerator cache
//! - `GET /stats` - Per-namespace cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
