//! Repository implementations for database operations.

pub mod application_export;
pub mod export_job;

pub use export_job::ExportJobRepository;
