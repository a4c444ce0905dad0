//! Export job entity.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for export jobs.
#[derive(Debug, Clone, FromRow)]
pub struct ExportJobEntity {
    pub id: Uuid,

    /// Owner of the job.
    pub user_id: Uuid,

    pub name: String,

    /// `{applications, training, employees, courses}` flags.
    pub data_types: JsonValue,

    /// Filter document as submitted.
    pub filters: JsonValue,

    pub format: String,

    pub scheduling: JsonValue,

    pub status: String,

    pub progress: i32,

    pub file_path: Option<String>,

    pub file_size: Option<i64>,

    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    pub expires_at: DateTime<Utc>,
}

/// Column list shared by every export job query.
pub const EXPORT_JOB_COLUMNS: &str = "id, user_id, name, data_types, filters, format, scheduling, \
     status, progress, file_path, file_size, error_message, created_at, completed_at, expires_at";
