//! Export pipeline error types.

use persistence::StorageError;
use thiserror::Error;

/// Failure while writing an export file.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("PDF error: {0}")]
    Pdf(String),

    /// The blocking render task panicked or was cancelled.
    #[error("Render task failed: {0}")]
    Task(String),
}

/// Failure of one job run. The display text is what lands in the job's
/// `error_message`.
#[derive(Debug, Error)]
pub enum ExportProcessingError {
    /// Connection acquisition kept failing after every retry.
    #[error("Failed to connect to database after {attempts} attempts: {message}")]
    ConnectionExhausted { attempts: u32, message: String },

    /// Every requested data type failed to collect.
    #[error("Data collection failed: {0}")]
    Collection(String),

    #[error("Data collection timeout")]
    CollectionTimeout,

    #[error("File generation failed: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The stored job cannot be processed (bad filters, row vanished mid-run).
    #[error("Invalid export job: {0}")]
    InvalidJob(String),
}
