//! Export pipeline services: data collection and file rendering.

pub mod collectors;
pub mod error;
pub mod renderers;

pub use collectors::{collect_dataset, collector_for, DataCollector};
pub use error::{ExportProcessingError, RenderError};
pub use renderers::{render_export, renderer_for, FileRenderer, RenderedFile};
