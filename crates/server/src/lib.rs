//! Rollup REST API Server Library
//!
//! Provides a web API for work-item progress rollups, enabling web UI and
//! external integrations to query epic and child progress.

pub mod routes;

// Re-export for convenience
pub use routes::create_routes;
