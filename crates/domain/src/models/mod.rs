//! Domain models for the Training Portal export pipeline.

pub mod export_data;
pub mod export_filter;
pub mod export_job;
pub mod user_role;

pub use export_data::{
    ApplicationRecord, CollectedRecords, CourseRecord, EmployeeRecord, ExportDataset,
    ExportDocument,
};
pub use export_filter::{
    ApplicationDateField, ApplicationFilters, ApplicationStatus, CanonicalFilterSet,
    CourseFilters, CourseLevel, DateFieldSelection, DateRange, EmployeeFilters, NumericRange,
    Priority, RawExportFilters, RecordDateField,
};
pub use export_job::{
    CreateExportRequest, CreateExportResponse, DataType, DataTypes, ExportFormat,
    ExportHistoryResponse, ExportJob, ExportJobStatus, ExportJobUpdate, ExportStatusResponse,
    ListExportsQuery, NewExportJob, ScheduleType, Scheduling, EXPORT_JOB_RETENTION_HOURS,
    PROGRESS_COLLECTED, PROGRESS_DONE, PROGRESS_RENDERED,
};
pub use user_role::UserRole;
