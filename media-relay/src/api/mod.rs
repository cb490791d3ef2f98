//! REST API server module.
//!
//! Provides HTTP endpoints for profile scraping, credential management,
//! video re-downloads, and liveness monitoring.

pub mod error;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod server;

pub use server::ApiServer;
