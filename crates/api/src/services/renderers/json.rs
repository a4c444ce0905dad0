//! Structured-text (JSON) renderer.

use chrono::{DateTime, Utc};
use domain::models::{ExportDataset, ExportFormat};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::FileRenderer;
use crate::services::error::RenderError;

/// Borrowed form of `domain::models::ExportDocument`.
#[derive(Serialize)]
struct Document<'a> {
    generated_at: DateTime<Utc>,
    data: &'a ExportDataset,
}

pub struct JsonRenderer;

impl FileRenderer for JsonRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn write(
        &self,
        dataset: &ExportDataset,
        generated_at: DateTime<Utc>,
        path: &Path,
    ) -> Result<(), RenderError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(
            &mut writer,
            &Document {
                generated_at,
                data: dataset,
            },
        )?;
        writer.flush()?;
        Ok(())
    }
}
