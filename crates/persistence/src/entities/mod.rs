//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod application_export;
pub mod export_job;

pub use application_export::ApplicationExportEntity;
pub use export_job::ExportJobEntity;
