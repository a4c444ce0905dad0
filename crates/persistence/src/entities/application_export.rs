//! Joined application row used by the applications export.

use chrono::{DateTime, Utc};
use domain::models::ApplicationRecord;
use sqlx::FromRow;
use uuid::Uuid;

/// Application joined with applicant, profile, course and reviewer profile.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationExportEntity {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub course_id: Uuid,
    pub status: String,
    pub priority: String,
    pub notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

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

    pub reviewer_name: Option<String>,
}

impl From<ApplicationExportEntity> for ApplicationRecord {
    fn from(entity: ApplicationExportEntity) -> Self {
        ApplicationRecord {
            id: entity.id,
            applicant_id: entity.applicant_id,
            course_id: entity.course_id,
            status: entity.status,
            priority: entity.priority,
            applicant_name: entity.applicant_name,
            applicant_email: entity.applicant_email,
            employee_id: entity.employee_id,
            department: entity.department,
            sub_organization: entity.sub_organization,
            job_title: entity.job_title,
            experience_years: entity.experience_years,
            manager_name: entity.manager_name,
            manager_email: entity.manager_email,
            course_title: entity.course_title,
            course_category: entity.course_category,
            course_level: entity.course_level,
            course_format: entity.course_format,
            course_duration: entity.course_duration,
            course_price: entity.course_price,
            course_is_active: entity.course_is_active,
            course_is_tamkeen_support: entity.course_is_tamkeen_support,
            reviewed_by: entity.reviewed_by,
            reviewer_name: entity.reviewer_name,
            notes: entity.notes,
            submitted_at: entity.submitted_at,
            reviewed_at: entity.reviewed_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
