//! Exported dataset models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::export_job::DataType;

/// Application joined with applicant profile, course and reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub course_id: Uuid,
    pub status: String,
    pub priority: String,
    pub applicant_name: Option<String>,
    pub applicant_email: String,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub sub_organization: Option<String>,
    pub job_title: Option<String>,
    pub experience_years: Option<i32>,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,
    pub course_title: String,
    pub course_category: Option<String>,
    pub course_level: Option<String>,
    pub course_format: Option<String>,
    pub course_duration: Option<String>,
    pub course_price: Option<f64>,
    pub course_is_active: bool,
    pub course_is_tamkeen_support: bool,
    pub reviewed_by: Option<Uuid>,
    pub reviewer_name: Option<String>,
    pub notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    pub fn display_name(&self) -> &str {
        self.applicant_name.as_deref().unwrap_or(&self.applicant_email)
    }
}

/// Course row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub level: Option<String>,
    pub duration: Option<String>,
    pub format: Option<String>,
    pub price: Option<f64>,
    pub is_active: bool,
    pub is_tamkeen_support: bool,
    pub created_at: DateTime<Utc>,
}

/// Employee (user profile) row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub experience_years: Option<i32>,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Records produced by one collector.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectedRecords {
    Applications(Vec<ApplicationRecord>),
    Courses(Vec<CourseRecord>),
    Employees(Vec<EmployeeRecord>),
}

impl CollectedRecords {
    pub fn data_type(&self) -> DataType {
        match self {
            CollectedRecords::Applications(_) => DataType::Applications,
            CollectedRecords::Courses(_) => DataType::Courses,
            CollectedRecords::Employees(_) => DataType::Employees,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CollectedRecords::Applications(rows) => rows.len(),
            CollectedRecords::Courses(rows) => rows.len(),
            CollectedRecords::Employees(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory dataset for one job run, keyed by entity type.
///
/// A `None` section was not requested (or failed to collect); `Some(vec![])`
/// was collected but matched nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applications: Option<Vec<ApplicationRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<CourseRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employees: Option<Vec<EmployeeRecord>>,
}

impl ExportDataset {
    pub fn insert(&mut self, records: CollectedRecords) {
        match records {
            CollectedRecords::Applications(rows) => self.applications = Some(rows),
            CollectedRecords::Courses(rows) => self.courses = Some(rows),
            CollectedRecords::Employees(rows) => self.employees = Some(rows),
        }
    }

    /// Record count for a section; `None` if the section is absent.
    pub fn count(&self, data_type: DataType) -> Option<usize> {
        match data_type {
            DataType::Applications => self.applications.as_ref().map(Vec::len),
            DataType::Courses => self.courses.as_ref().map(Vec::len),
            DataType::Employees => self.employees.as_ref().map(Vec::len),
            DataType::Training => None,
        }
    }

    pub fn total_records(&self) -> usize {
        [DataType::Applications, DataType::Courses, DataType::Employees]
            .iter()
            .filter_map(|t| self.count(*t))
            .sum()
    }

    pub fn applications(&self) -> &[ApplicationRecord] {
        self.applications.as_deref().unwrap_or_default()
    }

    pub fn courses(&self) -> &[CourseRecord] {
        self.courses.as_deref().unwrap_or_default()
    }

    pub fn employees(&self) -> &[EmployeeRecord] {
        self.employees.as_deref().unwrap_or_default()
    }
}

/// Structured-text export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub generated_at: DateTime<Utc>,
    pub data: ExportDataset,
}
