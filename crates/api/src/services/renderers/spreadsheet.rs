//! Spreadsheet (xlsx) renderer: one worksheet per non-empty entity type.

use chrono::{DateTime, Utc};
use domain::models::{ApplicationRecord, CourseRecord, EmployeeRecord, ExportDataset, ExportFormat};
use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};
use std::path::Path;

use super::{display_date, yes_no, FileRenderer};
use crate::services::error::RenderError;

/// Header text and column width.
type Column = (&'static str, f64);

const APPLICATION_COLUMNS: [Column; 11] = [
    ("ID", 36.0),
    ("Applicant Name", 20.0),
    ("Course Title", 30.0),
    ("Tamkeen Support", 15.0),
    ("Status", 15.0),
    ("Priority", 10.0),
    ("Submitted At", 20.0),
    ("Department", 20.0),
    ("Job Title", 20.0),
    ("Manager Name", 20.0),
    ("Manager Email", 25.0),
];

const COURSE_COLUMNS: [Column; 9] = [
    ("ID", 36.0),
    ("Title", 30.0),
    ("Category", 20.0),
    ("Level", 15.0),
    ("Duration", 15.0),
    ("Format", 20.0),
    ("Price", 10.0),
    ("Active", 10.0),
    ("Created At", 20.0),
];

const EMPLOYEE_COLUMNS: [Column; 9] = [
    ("ID", 36.0),
    ("Full Name", 25.0),
    ("Email", 30.0),
    ("Employee ID", 15.0),
    ("Department", 20.0),
    ("Job Title", 25.0),
    ("Experience Years", 15.0),
    ("Manager Name", 25.0),
    ("Manager Email", 30.0),
];

const HEADER_FILL: u32 = 0xD3D3D3;

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Cell::Blank, |s| Cell::Text(s.to_string()))
    }
}

pub struct SpreadsheetRenderer;

impl FileRenderer for SpreadsheetRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Excel
    }

    fn write(
        &self,
        dataset: &ExportDataset,
        _generated_at: DateTime<Utc>,
        path: &Path,
    ) -> Result<(), RenderError> {
        let mut workbook = Workbook::new();
        let header = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(HEADER_FILL));

        let mut sheets = 0;
        if !dataset.applications().is_empty() {
            let rows = dataset.applications().iter().map(application_row);
            write_sheet(&mut workbook, "Applications", &APPLICATION_COLUMNS, rows, &header)?;
            sheets += 1;
        }
        if !dataset.courses().is_empty() {
            let rows = dataset.courses().iter().map(course_row);
            write_sheet(&mut workbook, "Courses", &COURSE_COLUMNS, rows, &header)?;
            sheets += 1;
        }
        if !dataset.employees().is_empty() {
            let rows = dataset.employees().iter().map(employee_row);
            write_sheet(&mut workbook, "Employees", &EMPLOYEE_COLUMNS, rows, &header)?;
            sheets += 1;
        }

        // A workbook needs at least one sheet.
        if sheets == 0 {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Export")?;
            sheet.write_string(0, 0, "No records matched the export filters")?;
        }

        workbook.save(path)?;
        Ok(())
    }
}

fn write_sheet<I>(
    workbook: &mut Workbook,
    name: &str,
    columns: &[Column],
    rows: I,
    header: &Format,
) -> Result<(), XlsxError>
where
    I: Iterator<Item = Vec<Cell>>,
{
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;

    for (col, (title, width)) in columns.iter().enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, *width)?;
        sheet.write_string_with_format(0, col, *title, header)?;
    }

    for (index, row) in rows.enumerate() {
        let row_num = (index + 1) as u32;
        for (col, cell) in row.into_iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) => {
                    sheet.write_string(row_num, col, text)?;
                }
                Cell::Number(value) => {
                    sheet.write_number(row_num, col, value)?;
                }
                Cell::Blank => {}
            }
        }
    }

    Ok(())
}

fn application_row(app: &ApplicationRecord) -> Vec<Cell> {
    vec![
        Cell::Text(app.id.to_string()),
        Cell::Text(app.display_name().to_string()),
        Cell::Text(app.course_title.clone()),
        Cell::Text(yes_no(app.course_is_tamkeen_support).to_string()),
        Cell::Text(app.status.clone()),
        Cell::Text(app.priority.clone()),
        app.submitted_at
            .map_or(Cell::Blank, |at| Cell::Text(display_date(at))),
        app.department.as_deref().into(),
        app.job_title.as_deref().into(),
        app.manager_name.as_deref().into(),
        app.manager_email.as_deref().into(),
    ]
}

fn course_row(course: &CourseRecord) -> Vec<Cell> {
    vec![
        Cell::Text(course.id.to_string()),
        Cell::Text(course.title.clone()),
        course.category.as_deref().into(),
        course.level.as_deref().into(),
        course.duration.as_deref().into(),
        course.format.as_deref().into(),
        course.price.map_or(Cell::Blank, Cell::Number),
        Cell::Text(yes_no(course.is_active).to_string()),
        Cell::Text(display_date(course.created_at)),
    ]
}

fn employee_row(employee: &EmployeeRecord) -> Vec<Cell> {
    vec![
        Cell::Text(employee.id.to_string()),
        Cell::Text(employee.full_name.clone()),
        Cell::Text(employee.email.clone()),
        employee.employee_id.as_deref().into(),
        employee.department.as_deref().into(),
        employee.job_title.as_deref().into(),
        employee
            .experience_years
            .map_or(Cell::Blank, |years| Cell::Number(f64::from(years))),
        employee.manager_name.as_deref().into(),
        employee.manager_email.as_deref().into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::renderers::fixtures;
    use domain::models::CollectedRecords;

    /// xlsx files are zip archives; the local file header starts with `PK`.
    fn assert_is_zip(path: &Path) {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_rows_match_column_schema() {
        assert_eq!(
            application_row(&fixtures::application("Sara", None)).len(),
            APPLICATION_COLUMNS.len()
        );
        assert_eq!(course_row(&fixtures::course("T")).len(), COURSE_COLUMNS.len());
        assert_eq!(
            employee_row(&fixtures::employee("Omar")).len(),
            EMPLOYEE_COLUMNS.len()
        );
    }

    #[test]
    fn test_application_row_formatting() {
        let row = application_row(&fixtures::application("Sara", None));
        assert_eq!(row[1], Cell::Text("Sara".to_string()));
        assert_eq!(row[3], Cell::Text("Yes".to_string()));
        assert_eq!(row[6], Cell::Text("3/5/2024".to_string()));
    }

    #[test]
    fn test_course_row_uses_numbers_and_flags() {
        let row = course_row(&fixtures::course("Leading Teams"));
        assert_eq!(row[6], Cell::Number(1200.0));
        assert_eq!(row[7], Cell::Text("No".to_string()));
    }

    #[test]
    fn test_writes_workbook() {
        let mut dataset = ExportDataset::default();
        dataset.insert(CollectedRecords::Applications(vec![fixtures::application(
            "Sara", None,
        )]));
        dataset.insert(CollectedRecords::Courses(vec![]));

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.xlsx");
        SpreadsheetRenderer.write(&dataset, Utc::now(), &path).unwrap();
        assert_is_zip(&path);
    }

    #[test]
    fn test_empty_dataset_still_writes_workbook() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty.xlsx");
        SpreadsheetRenderer
            .write(&ExportDataset::default(), Utc::now(), &path)
            .unwrap();
        assert_is_zip(&path);
    }
}
