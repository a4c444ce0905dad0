//! Export filter models.
//!
//! `RawExportFilters` mirrors the loosely-shaped JSON document a caller
//! submits; `CanonicalFilterSet` is the closed shape the collectors consume
//! after normalization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::user_role::UserRole;
use crate::error::ExportValidationError;

/// Application workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Cancelled,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "submitted" => Ok(ApplicationStatus::Submitted),
            "under_review" => Ok(ApplicationStatus::UnderReview),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "cancelled" => Ok(ApplicationStatus::Cancelled),
            _ => Err(format!("Unknown application status: {}", s)),
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Course difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Beginner => "beginner",
            CourseLevel::Intermediate => "intermediate",
            CourseLevel::Advanced => "advanced",
            CourseLevel::Expert => "expert",
        }
    }
}

/// Date column an application date range applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationDateField {
    SubmittedAt,
    ReviewedAt,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl ApplicationDateField {
    /// Column name on the `applications` table.
    pub fn column(&self) -> &'static str {
        match self {
            ApplicationDateField::SubmittedAt => "submitted_at",
            ApplicationDateField::ReviewedAt => "reviewed_at",
            ApplicationDateField::CreatedAt => "created_at",
            ApplicationDateField::UpdatedAt => "updated_at",
        }
    }
}

/// Date column a course or employee date range applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordDateField {
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl RecordDateField {
    pub fn column(&self) -> &'static str {
        match self {
            RecordDateField::CreatedAt => "created_at",
            RecordDateField::UpdatedAt => "updated_at",
        }
    }
}

/// Which date field each entity type filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFieldSelection {
    pub applications: ApplicationDateField,
    pub courses: RecordDateField,
    pub employees: RecordDateField,
}

/// Optional numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Filter document as submitted with an export request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawExportFilters {
    pub date_range: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,

    pub application_status: Vec<ApplicationStatus>,
    pub application_priority: Vec<Priority>,
    pub applicant_department: Vec<String>,
    pub applicant_sub_organization: Vec<String>,
    pub course_categories: Vec<String>,
    pub reviewed_by: Vec<String>,

    pub course_level: Vec<CourseLevel>,
    pub course_format: Vec<String>,
    pub course_category: Vec<String>,
    pub course_ids: Vec<Uuid>,
    pub price_range: Option<NumericRange>,
    pub course_active: Option<bool>,

    pub employee_department: Vec<String>,
    pub employee_role: Vec<UserRole>,
    pub employee_sub_organization: Vec<String>,
    pub experience_range: Option<NumericRange>,
    pub job_title: Vec<String>,
    pub manager_name: Vec<String>,

    pub date_field: DateFieldSelection,

    pub text_search: Option<String>,
    pub exclude_inactive: bool,
    pub include_deleted: bool,

    /// Legacy alias merged into `applicant_sub_organization`.
    pub organizations: Vec<String>,
    /// Legacy alias merged into `application_status`.
    pub status: Vec<String>,

    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl RawExportFilters {
    /// Parses a filter document; `null` is treated as no filters.
    pub fn from_json(value: &JsonValue) -> Result<Self, ExportValidationError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
            .map_err(|e| ExportValidationError::validation(format!("Invalid filters: {}", e)))
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// First date after the range, for half-open `< end + 1 day` predicates.
    pub fn end_exclusive(&self) -> NaiveDate {
        self.end.succ_opt().unwrap_or(self.end)
    }
}

/// Application filters after normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationFilters {
    pub statuses: Vec<ApplicationStatus>,
    pub priorities: Vec<Priority>,
    pub departments: Vec<String>,
    pub sub_organizations: Vec<String>,
    pub course_categories: Vec<String>,
    pub reviewed_by: Vec<String>,
}

/// Course filters after normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseFilters {
    pub levels: Vec<CourseLevel>,
    pub formats: Vec<String>,
    pub categories: Vec<String>,
    pub course_ids: Vec<Uuid>,
    pub price_range: Option<NumericRange>,
    pub active: Option<bool>,
}

/// Employee filters after normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeFilters {
    pub departments: Vec<String>,
    pub roles: Vec<UserRole>,
    pub sub_organizations: Vec<String>,
    pub experience_range: Option<NumericRange>,
    pub job_titles: Vec<String>,
    pub manager_names: Vec<String>,
}

/// Closed, validated filter shape consumed by the data collectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFilterSet {
    pub date_range: Option<DateRange>,
    pub date_fields: DateFieldSelection,
    pub applications: ApplicationFilters,
    pub courses: CourseFilters,
    pub employees: EmployeeFilters,
    pub text_search: Option<String>,
    pub exclude_inactive: bool,
    /// Carried through; no collected entity has a soft-delete column.
    pub include_deleted: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
