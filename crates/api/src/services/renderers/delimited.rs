//! Delimited-text (CSV) renderer.
//!
//! One flat table for every entity type, discriminated by the `Type` column.

use chrono::{DateTime, Utc};
use domain::models::{
    ApplicationRecord, CourseRecord, DataType, EmployeeRecord, ExportDataset, ExportFormat,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{display_date, yes_no, FileRenderer};
use crate::services::error::RenderError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const HEADER: [&str; 9] = [
    "Type",
    "ID",
    "Name",
    "Title/Category",
    "Tamkeen Support",
    "Status",
    "Department/Level",
    "Date",
    "Additional Info",
];

pub struct DelimitedRenderer;

impl FileRenderer for DelimitedRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn write(
        &self,
        dataset: &ExportDataset,
        _generated_at: DateTime<Utc>,
        path: &Path,
    ) -> Result<(), RenderError> {
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(UTF8_BOM)?;

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);

        writer.write_record(HEADER)?;
        for app in dataset.applications() {
            writer.write_record(&application_row(app))?;
        }
        for course in dataset.courses() {
            writer.write_record(&course_row(course))?;
        }
        for employee in dataset.employees() {
            writer.write_record(&employee_row(employee))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn opt(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn application_row(app: &ApplicationRecord) -> [String; 9] {
    [
        DataType::Applications.record_label().to_string(),
        app.id.to_string(),
        app.display_name().to_string(),
        app.course_title.clone(),
        yes_no(app.course_is_tamkeen_support).to_string(),
        app.status.clone(),
        opt(app.department.as_deref()),
        app.submitted_at.map(display_date).unwrap_or_default(),
        format!("Priority: {}", app.priority),
    ]
}

fn course_row(course: &CourseRecord) -> [String; 9] {
    [
        DataType::Courses.record_label().to_string(),
        course.id.to_string(),
        course.title.clone(),
        opt(course.category.as_deref()),
        yes_no(course.is_tamkeen_support).to_string(),
        if course.is_active { "Active" } else { "Inactive" }.to_string(),
        opt(course.level.as_deref()),
        display_date(course.created_at),
        format!(
            "Duration: {}, Format: {}",
            course.duration.as_deref().unwrap_or("N/A"),
            course.format.as_deref().unwrap_or("N/A")
        ),
    ]
}

fn employee_row(employee: &EmployeeRecord) -> [String; 9] {
    [
        DataType::Employees.record_label().to_string(),
        employee.id.to_string(),
        employee.full_name.clone(),
        opt(employee.job_title.as_deref()),
        String::new(),
        "Active".to_string(),
        opt(employee.department.as_deref()),
        display_date(employee.created_at),
        format!(
            "Experience: {} years, Manager: {}",
            employee.experience_years.unwrap_or(0),
            employee.manager_name.as_deref().unwrap_or("N/A")
        ),
    ]
}
