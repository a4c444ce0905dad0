//! Domain services for the export pipeline.
//!
//! Services contain business logic that operates on domain models.

pub mod export_policy;
pub mod filter_normalizer;

pub use export_policy::{check_export_permission, validate_export_request};
pub use filter_normalizer::{normalize_filters, resolve_date_range, DatePreset};
