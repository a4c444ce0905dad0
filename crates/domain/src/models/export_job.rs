//! Export job domain models.
//!
//! An export job is one user-initiated request to produce a downloadable
//! file from filtered application, course or employee data.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use shared::pagination::PageInfo;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::export_filter::RawExportFilters;

/// Default retention window for rendered exports, in hours (7 days).
pub const EXPORT_JOB_RETENTION_HOURS: i64 = 168;

/// Progress once data collection has finished.
pub const PROGRESS_COLLECTED: i32 = 75;

/// Progress once the file has been rendered.
pub const PROGRESS_RENDERED: i32 = 90;

/// Progress of a completed job.
pub const PROGRESS_DONE: i32 = 100;

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Csv,
    Pdf,
    Json,
}

impl ExportFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }

    /// `Content-Type` header value used when downloading.
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Json => "application/json; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "excel" => Ok(ExportFormat::Excel),
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Excel => write!(f, "excel"),
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Pdf => write!(f, "pdf"),
            ExportFormat::Json => write!(f, "json"),
        }
    }
}

/// Export job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExportJobStatus {
    /// Statuses a job may be in when it moves to `self`.
    ///
    /// Transitions only move forward: `pending -> processing -> completed`
    /// or `failed`. A job may also fail straight from `pending`. Claiming
    /// requires `pending`, so a job already `processing` cannot be claimed
    /// twice.
    pub fn predecessors(&self) -> &'static [ExportJobStatus] {
        match self {
            ExportJobStatus::Pending => &[],
            ExportJobStatus::Processing => &[ExportJobStatus::Pending],
            ExportJobStatus::Completed => &[ExportJobStatus::Processing],
            ExportJobStatus::Failed => &[ExportJobStatus::Pending, ExportJobStatus::Processing],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportJobStatus::Completed | ExportJobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportJobStatus::Pending => "pending",
            ExportJobStatus::Processing => "processing",
            ExportJobStatus::Completed => "completed",
            ExportJobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ExportJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ExportJobStatus::Pending),
            "processing" => Ok(ExportJobStatus::Processing),
            "completed" => Ok(ExportJobStatus::Completed),
            "failed" => Ok(ExportJobStatus::Failed),
            _ => Err(format!("Unknown export job status: {}", s)),
        }
    }
}

/// Exportable entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Applications,
    Training,
    Employees,
    Courses,
}

impl DataType {
    /// Key used in the dataset and JSON output.
    pub fn key(&self) -> &'static str {
        match self {
            DataType::Applications => "applications",
            DataType::Training => "training",
            DataType::Employees => "employees",
            DataType::Courses => "courses",
        }
    }

    /// Singular label used as the CSV `Type` discriminator.
    pub fn record_label(&self) -> &'static str {
        match self {
            DataType::Applications => "Application",
            DataType::Training => "Training",
            DataType::Employees => "Employee",
            DataType::Courses => "Course",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Requested entity types, keyed by flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataTypes {
    pub applications: bool,
    pub training: bool,
    pub employees: bool,
    pub courses: bool,
}

impl DataTypes {
    pub fn any_selected(&self) -> bool {
        self.applications || self.training || self.employees || self.courses
    }

    /// Selected types in fixed order: applications, training, employees, courses.
    pub fn selected(&self) -> Vec<DataType> {
        let mut selected = Vec::with_capacity(4);
        if self.applications {
            selected.push(DataType::Applications);
        }
        if self.training {
            selected.push(DataType::Training);
        }
        if self.employees {
            selected.push(DataType::Employees);
        }
        if self.courses {
            selected.push(DataType::Courses);
        }
        selected
    }

    pub fn contains(&self, data_type: DataType) -> bool {
        match data_type {
            DataType::Applications => self.applications,
            DataType::Training => self.training,
            DataType::Employees => self.employees,
            DataType::Courses => self.courses,
        }
    }
}

/// How often an export should run.
///
/// Only `OneTime` is executed; recurring types are stored as submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleType {
    #[default]
    OneTime,
    Daily,
    Weekly,
    Monthly,
}

/// Scheduling block of an export request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scheduling {
    #[serde(rename = "type", default)]
    pub schedule_type: ScheduleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

impl Scheduling {
    pub fn is_recurring(&self) -> bool {
        self.schedule_type != ScheduleType::OneTime
    }
}

/// Export job as stored in the job table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub data_types: DataTypes,
    /// Filters as submitted; re-normalized when the job is processed.
    pub filters: JsonValue,
    pub format: ExportFormat,
    pub scheduling: Scheduling,
    pub status: ExportJobStatus,
    pub progress: i32,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl ExportJob {
    /// Parses the stored filter document.
    pub fn raw_filters(&self) -> Result<RawExportFilters, serde_json::Error> {
        if self.filters.is_null() {
            return Ok(RawExportFilters::default());
        }
        serde_json::from_value(self.filters.clone())
    }

    /// Download link for completed jobs.
    pub fn download_url(&self) -> Option<String> {
        (self.status == ExportJobStatus::Completed)
            .then(|| format!("/api/v1/exports/{}/download", self.id))
    }
}

/// Fields needed to enqueue a job.
#[derive(Debug, Clone)]
pub struct NewExportJob {
    pub user_id: Uuid,
    pub name: String,
    pub data_types: DataTypes,
    pub filters: JsonValue,
    pub format: ExportFormat,
    pub scheduling: Scheduling,
    pub expires_at: DateTime<Utc>,
}

impl NewExportJob {
    /// Builds a pending job from a validated request.
    pub fn from_request(
        user_id: Uuid,
        request: CreateExportRequest,
        now: DateTime<Utc>,
        retention_hours: i64,
    ) -> Self {
        Self {
            user_id,
            name: request.name.trim().to_string(),
            data_types: request.data_types,
            filters: request.filters,
            format: request.format,
            scheduling: request.scheduling.unwrap_or_default(),
            expires_at: now + Duration::hours(retention_hours),
        }
    }
}

/// Partial update of a job; only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportJobUpdate {
    pub status: Option<ExportJobStatus>,
    pub progress: Option<i32>,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExportJobUpdate {
    pub fn processing() -> Self {
        Self {
            status: Some(ExportJobStatus::Processing),
            progress: Some(0),
            ..Default::default()
        }
    }

    pub fn progress(progress: i32) -> Self {
        Self {
            progress: Some(progress.clamp(0, PROGRESS_DONE)),
            ..Default::default()
        }
    }

    pub fn completed(file_path: String, file_size: i64, completed_at: DateTime<Utc>) -> Self {
        Self {
            status: Some(ExportJobStatus::Completed),
            progress: Some(PROGRESS_DONE),
            file_path: Some(file_path),
            file_size: Some(file_size),
            completed_at: Some(completed_at),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(ExportJobStatus::Failed),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.file_path.is_none()
            && self.file_size.is_none()
            && self.error_message.is_none()
            && self.completed_at.is_none()
    }
}

/// Request body for `POST /api/v1/exports`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExportRequest {
    #[validate(length(min = 1, max = 255, message = "Export name is required"))]
    pub name: String,

    #[serde(default)]
    pub data_types: DataTypes,

    #[serde(default)]
    pub filters: JsonValue,

    pub format: ExportFormat,

    #[serde(default)]
    pub scheduling: Option<Scheduling>,
}

/// Response body for a newly created export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExportResponse {
    pub export_id: Uuid,
    pub status: ExportJobStatus,
}

/// Status view of one export job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStatusResponse {
    pub id: Uuid,
    pub name: String,
    pub status: ExportJobStatus,
    pub progress: i32,
    pub format: ExportFormat,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&ExportJob> for ExportStatusResponse {
    fn from(job: &ExportJob) -> Self {
        let completed = job.status == ExportJobStatus::Completed;
        let failed = job.status == ExportJobStatus::Failed;
        Self {
            id: job.id,
            name: job.name.clone(),
            status: job.status,
            progress: job.progress,
            format: job.format,
            created_at: job.created_at,
            completed_at: job.completed_at,
            file_size: if completed { job.file_size } else { None },
            download_url: job.download_url(),
            error_message: if failed { job.error_message.clone() } else { None },
        }
    }
}

/// Query parameters for the export history listing.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListExportsQuery {
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u32>,
    pub status: Option<ExportJobStatus>,
}

/// One page of the caller's export history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportHistoryResponse {
    pub exports: Vec<ExportStatusResponse>,
    pub pagination: PageInfo,
}
