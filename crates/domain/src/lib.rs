//! Domain layer for the Training Portal backend.
//!
//! This crate contains:
//! - Export domain models (jobs, filters, exported records, roles)
//! - Pure business services (filter normalization, export policy)
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::ExportValidationError;
