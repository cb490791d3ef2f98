//! media-relay application library.
//!
//! Wires the upstream clients into an HTTP API with rate limiting,
//! credential management, and liveness monitoring.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
