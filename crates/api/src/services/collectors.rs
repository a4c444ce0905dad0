//! Data collectors: one per exportable entity type.

use async_trait::async_trait;
use domain::models::{CanonicalFilterSet, CollectedRecords, DataType, DataTypes, ExportDataset};
use persistence::{ExportSession, StorageError};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::ExportProcessingError;

/// Fetches the records of one entity type matching a filter set.
#[async_trait]
pub trait DataCollector: Send + Sync {
    fn data_type(&self) -> DataType;

    async fn collect(
        &self,
        session: &mut dyn ExportSession,
        filters: &CanonicalFilterSet,
    ) -> Result<CollectedRecords, StorageError>;
}

/// Applications joined with applicant, course and reviewer.
pub struct ApplicationsCollector;

#[async_trait]
impl DataCollector for ApplicationsCollector {
    fn data_type(&self) -> DataType {
        DataType::Applications
    }

    async fn collect(
        &self,
        session: &mut dyn ExportSession,
        filters: &CanonicalFilterSet,
    ) -> Result<CollectedRecords, StorageError> {
        let records = session.fetch_applications(filters).await?;
        Ok(CollectedRecords::Applications(records))
    }
}

/// Courses. No data source yet: always an empty success.
pub struct CoursesCollector;

#[async_trait]
impl DataCollector for CoursesCollector {
    fn data_type(&self) -> DataType {
        DataType::Courses
    }

    async fn collect(
        &self,
        _session: &mut dyn ExportSession,
        _filters: &CanonicalFilterSet,
    ) -> Result<CollectedRecords, StorageError> {
        Ok(CollectedRecords::Courses(Vec::new()))
    }
}

/// Employees. No data source yet: always an empty success.
pub struct EmployeesCollector;

#[async_trait]
impl DataCollector for EmployeesCollector {
    fn data_type(&self) -> DataType {
        DataType::Employees
    }

    async fn collect(
        &self,
        _session: &mut dyn ExportSession,
        _filters: &CanonicalFilterSet,
    ) -> Result<CollectedRecords, StorageError> {
        Ok(CollectedRecords::Employees(Vec::new()))
    }
}

/// Collector for a data type; `None` for types nothing collects (training).
pub fn collector_for(data_type: DataType) -> Option<Box<dyn DataCollector>> {
    match data_type {
        DataType::Applications => Some(Box::new(ApplicationsCollector)),
        DataType::Courses => Some(Box::new(CoursesCollector)),
        DataType::Employees => Some(Box::new(EmployeesCollector)),
        DataType::Training => None,
    }
}

/// Runs the collector of every requested type.
///
/// A failing type is logged and left out of the dataset. The run fails only
/// when no requested type could be collected.
pub async fn collect_dataset(
    export_id: Uuid,
    session: &mut dyn ExportSession,
    data_types: &DataTypes,
    filters: &CanonicalFilterSet,
) -> Result<ExportDataset, ExportProcessingError> {
    let mut dataset = ExportDataset::default();
    let mut failures = Vec::new();
    let mut collected = 0usize;

    for data_type in data_types.selected() {
        let Some(collector) = collector_for(data_type) else {
            warn!(
                export_id = %export_id,
                data_type = %data_type,
                "No collector for data type, skipping"
            );
            continue;
        };

        let start = Instant::now();
        match collector.collect(&mut *session, filters).await {
            Ok(records) => {
                info!(
                    export_id = %export_id,
                    data_type = %data_type,
                    records = records.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Collected export data"
                );
                dataset.insert(records);
                collected += 1;
            }
            Err(e) => {
                warn!(
                    export_id = %export_id,
                    data_type = %data_type,
                    error = %e,
                    "Failed to collect export data"
                );
                failures.push(format!("{}: {}", data_type, e));
            }
        }
    }

    if collected == 0 && !failures.is_empty() {
        return Err(ExportProcessingError::Collection(failures.join("; ")));
    }

    Ok(dataset)
}
