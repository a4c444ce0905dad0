//! Persistence layer for the Training Portal backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - The storage seam used by the export processor

pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use error::StorageError;
pub use store::{ExportSession, ExportStorage, PgExportSession, PgExportStorage};
