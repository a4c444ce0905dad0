//! Training portal export API.
//!
//! HTTP surface for export jobs plus the background processor that renders
//! them.

pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod services;
