//! Background jobs.

mod export_processor;

pub use export_processor::{ExportProcessor, ProcessorSettings};
