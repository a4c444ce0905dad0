//! File renderers: one per export format.
//!
//! Renderers are synchronous; the processor runs them on the blocking pool.

pub mod delimited;
pub mod json;
pub mod pdf;
pub mod spreadsheet;

use chrono::{DateTime, Utc};
use domain::models::{ExportDataset, ExportFormat};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::RenderError;

pub use delimited::DelimitedRenderer;
pub use json::JsonRenderer;
pub use pdf::PdfRenderer;
pub use spreadsheet::SpreadsheetRenderer;

/// A file written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Size on disk, from the filesystem.
    pub size: u64,
}

pub trait FileRenderer: Send + Sync {
    fn format(&self) -> ExportFormat;

    /// Writes `dataset` to `path`, replacing any existing file.
    fn write(
        &self,
        dataset: &ExportDataset,
        generated_at: DateTime<Utc>,
        path: &Path,
    ) -> Result<(), RenderError>;
}

pub fn renderer_for(format: ExportFormat) -> &'static dyn FileRenderer {
    match format {
        ExportFormat::Excel => &SpreadsheetRenderer,
        ExportFormat::Csv => &DelimitedRenderer,
        ExportFormat::Pdf => &PdfRenderer,
        ExportFormat::Json => &JsonRenderer,
    }
}

/// Renders `dataset` to `<output_dir>/<file_stem>.<ext>`.
///
/// Creates the output directory if needed.
pub fn render_export(
    dataset: &ExportDataset,
    format: ExportFormat,
    output_dir: &Path,
    file_stem: &str,
    generated_at: DateTime<Utc>,
) -> Result<RenderedFile, RenderError> {
    fs::create_dir_all(output_dir)?;

    let path = output_dir.join(format!("{}.{}", file_stem, format.extension()));
    renderer_for(format).write(dataset, generated_at, &path)?;

    let path = fs::canonicalize(&path)?;
    let size = fs::metadata(&path)?.len();
    Ok(RenderedFile { path, size })
}

/// Date as shown in rendered files (`M/D/YYYY`).
pub(crate) fn display_date(at: DateTime<Utc>) -> String {
    at.format("%-m/%-d/%Y").to_string()
}

pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};
    use domain::models::{ApplicationRecord, CourseRecord, EmployeeRecord};
    use uuid::Uuid;

    pub fn application(name: &str, notes: Option<&str>) -> ApplicationRecord {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        ApplicationRecord {
            id: Uuid::new_v4(),
            applicant_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            status: "approved".to_string(),
            priority: "high".to_string(),
            applicant_name: Some(name.to_string()),
            applicant_email: "applicant@example.com".to_string(),
            employee_id: Some("E-100".to_string()),
            department: Some("Finance, Audit".to_string()),
            sub_organization: None,
            job_title: Some("Analyst".to_string()),
            experience_years: Some(4),
            manager_name: Some("Mona".to_string()),
            manager_email: Some("mona@example.com".to_string()),
            course_title: "Data \"Literacy\"".to_string(),
            course_category: Some("Technology".to_string()),
            course_level: Some("beginner".to_string()),
            course_format: Some("online".to_string()),
            course_duration: Some("2 days".to_string()),
            course_price: Some(250.0),
            course_is_active: true,
            course_is_tamkeen_support: true,
            reviewed_by: None,
            reviewer_name: None,
            notes: notes.map(str::to_string),
            submitted_at: Some(at),
            reviewed_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn course(title: &str) -> CourseRecord {
        CourseRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            category: Some("Leadership".to_string()),
            level: Some("advanced".to_string()),
            duration: Some("5 days".to_string()),
            format: Some("classroom".to_string()),
            price: Some(1200.0),
            is_active: false,
            is_tamkeen_support: false,
            created_at: Utc.with_ymd_and_hms(2023, 11, 20, 8, 0, 0).unwrap(),
        }
    }

    pub fn employee(name: &str) -> EmployeeRecord {
        EmployeeRecord {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            email: "employee@example.com".to_string(),
            employee_id: Some("E-200".to_string()),
            department: Some("HR".to_string()),
            job_title: Some("Recruiter".to_string()),
            experience_years: Some(7),
            manager_name: None,
            manager_email: None,
            created_at: Utc.with_ymd_and_hms(2022, 1, 9, 8, 0, 0).unwrap(),
        }
    }
}
