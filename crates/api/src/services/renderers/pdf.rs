//! Paged report (PDF) renderer.
//!
//! Layout is computed first as positioned text lines, then drawn with
//! printpdf. Coordinates are in points from the top-left of a US Letter page.
//! Sections show a capped number of entries; the cap only limits what is
//! printed, never the exported dataset.

use chrono::{DateTime, Utc};
use domain::models::{ExportDataset, ExportFormat};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Pt};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{display_date, yes_no, FileRenderer};
use crate::services::error::RenderError;

pub const APPLICATIONS_DISPLAY_LIMIT: usize = 20;
pub const COURSES_DISPLAY_LIMIT: usize = 15;
pub const EMPLOYEES_DISPLAY_LIMIT: usize = 15;

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const TOP_MARGIN: f32 = 50.0;
/// An entry starting below this line moves to a new page.
const ENTRY_LIMIT: f32 = 700.0;
/// A section header starting below this line moves to a new page.
const SECTION_LIMIT: f32 = 600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub size: f32,
    pub x: f32,
    pub y: f32,
    pub bold: bool,
}

/// Text lines grouped by page.
#[derive(Debug, Default)]
pub struct ReportLayout {
    pub pages: Vec<Vec<TextLine>>,
    y: f32,
}

impl ReportLayout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: 0.0,
        }
    }

    fn text(&mut self, text: impl Into<String>, size: f32, x: f32, y: f32, bold: bool) {
        if let Some(page) = self.pages.last_mut() {
            page.push(TextLine {
                text: text.into(),
                size,
                x,
                y,
                bold,
            });
        }
    }

    fn break_page_after(&mut self, limit: f32) {
        if self.y > limit {
            self.pages.push(Vec::new());
            self.y = TOP_MARGIN;
        }
    }

    fn section<T>(
        &mut self,
        title: &str,
        noun: &str,
        items: &[T],
        limit: usize,
        describe: impl Fn(&T) -> (String, String),
    ) {
        if items.is_empty() {
            return;
        }

        self.break_page_after(SECTION_LIMIT);
        self.text(title, 16.0, 50.0, self.y, true);
        self.y += 30.0;

        for (index, item) in items.iter().take(limit).enumerate() {
            self.break_page_after(ENTRY_LIMIT);
            let (headline, detail) = describe(item);
            self.text(format!("{}. {}", index + 1, headline), 10.0, 70.0, self.y, false);
            self.text(detail, 10.0, 90.0, self.y + 15.0, false);
            self.y += 35.0;
        }

        if items.len() > limit {
            self.text(
                format!("... and {} more {}", items.len() - limit, noun),
                10.0,
                70.0,
                self.y,
                false,
            );
            self.y += 20.0;
        }
        self.y += 20.0;
    }

    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.pages.iter().flatten()
    }
}

fn or_na<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

pub fn layout_report(dataset: &ExportDataset, generated_at: DateTime<Utc>) -> ReportLayout {
    let mut layout = ReportLayout::new();
    layout.text("Export Report", 20.0, 50.0, 50.0, true);
    layout.text(
        format!("Generated on: {}", display_date(generated_at)),
        12.0,
        50.0,
        80.0,
        false,
    );
    layout.y = 120.0;

    if dataset.total_records() == 0 {
        layout.text("No records matched the export filters.", 12.0, 50.0, layout.y, false);
        return layout;
    }

    layout.section(
        "Applications",
        "applications",
        dataset.applications(),
        APPLICATIONS_DISPLAY_LIMIT,
        |app| {
            (
                format!("{} - {}", app.display_name(), app.course_title),
                format!(
                    "Status: {}, Department: {}, Tamkeen: {}",
                    app.status,
                    or_na(app.department.as_deref()),
                    yes_no(app.course_is_tamkeen_support)
                ),
            )
        },
    );
    layout.section(
        "Courses",
        "courses",
        dataset.courses(),
        COURSES_DISPLAY_LIMIT,
        |course| {
            (
                format!("{} - {}", course.title, or_na(course.category.as_deref())),
                format!(
                    "Level: {}, Duration: {}, Tamkeen: {}",
                    or_na(course.level.as_deref()),
                    or_na(course.duration.as_deref()),
                    yes_no(course.is_tamkeen_support)
                ),
            )
        },
    );
    layout.section(
        "Employees",
        "employees",
        dataset.employees(),
        EMPLOYEES_DISPLAY_LIMIT,
        |employee| {
            (
                format!(
                    "{} - {}",
                    employee.full_name,
                    or_na(employee.job_title.as_deref())
                ),
                format!(
                    "Department: {}, Experience: {} years",
                    or_na(employee.department.as_deref()),
                    or_na(employee.experience_years)
                ),
            )
        },
    );

    layout
}

pub struct PdfRenderer;

impl FileRenderer for PdfRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn write(
        &self,
        dataset: &ExportDataset,
        generated_at: DateTime<Utc>,
        path: &Path,
    ) -> Result<(), RenderError> {
        let layout = layout_report(dataset, generated_at);

        let width = Mm::from(Pt(PAGE_WIDTH));
        let height = Mm::from(Pt(PAGE_HEIGHT));
        let (doc, first_page, first_layer) =
            PdfDocument::new("Export Report", width, height, "Report");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;

        for (index, lines) in layout.pages.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) = doc.add_page(width, height, "Report");
                doc.get_page(page).get_layer(layer)
            };
            draw_lines(&layer, lines, &regular, &bold);
        }

        let mut writer = BufWriter::new(File::create(path)?);
        doc.save(&mut writer).map_err(pdf_error)?;
        writer.flush()?;
        Ok(())
    }
}

fn draw_lines(
    layer: &PdfLayerReference,
    lines: &[TextLine],
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    for line in lines {
        let font = if line.bold { bold } else { regular };
        // PDF origin is bottom-left; the layout's y is the top of the line.
        let baseline = PAGE_HEIGHT - line.y - line.size;
        layer.use_text(
            line.text.as_str(),
            line.size,
            Mm::from(Pt(line.x)),
            Mm::from(Pt(baseline)),
            font,
        );
    }
}

fn pdf_error(err: impl Display) -> RenderError {
    RenderError::Pdf(err.to_string())
}
