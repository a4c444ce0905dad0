//! Export job repository for database operations.
//!
//! The job table doubles as the processor's work queue. Single-statement
//! operations the processor needs are also exposed as executor-generic
//! functions so they can run on a dedicated pooled connection.

use chrono::{DateTime, Utc};
use domain::models::{
    DataTypes, ExportFormat, ExportJob, ExportJobStatus, ExportJobUpdate, NewExportJob,
    Scheduling,
};
use shared::pagination::PageRequest;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::entities::export_job::{ExportJobEntity, EXPORT_JOB_COLUMNS};
use crate::error::StorageError;
use crate::metrics::QueryTimer;

/// Repository for export job database operations.
#[derive(Clone)]
pub struct ExportJobRepository {
    pool: PgPool,
}

impl ExportJobRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a new job in `pending` status with zero progress.
    pub async fn create(&self, job: &NewExportJob) -> Result<ExportJob, StorageError> {
        let timer = QueryTimer::new("create_export_job");
        let result = sqlx::query_as::<_, ExportJobEntity>(
            r#"
            INSERT INTO export_jobs (user_id, name, data_types, filters, format, scheduling,
                                     status, progress, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', 0, $7)
            RETURNING id, user_id, name, data_types, filters, format, scheduling,
                      status, progress, file_path, file_size, error_message,
                      created_at, completed_at, expires_at
            "#,
        )
        .bind(job.user_id)
        .bind(&job.name)
        .bind(Json(&job.data_types))
        .bind(&job.filters)
        .bind(job.format.to_string())
        .bind(Json(&job.scheduling))
        .bind(job.expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        entity_to_domain(result?)
    }

    /// Find a job by id, optionally restricted to one owner.
    pub async fn find_by_id(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
    ) -> Result<Option<ExportJob>, StorageError> {
        let timer = QueryTimer::new("find_export_job_by_id");
        let result = sqlx::query_as::<_, ExportJobEntity>(
            r#"
            SELECT id, user_id, name, data_types, filters, format, scheduling,
                   status, progress, file_path, file_size, error_message,
                   created_at, completed_at, expires_at
            FROM export_jobs
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result?.map(entity_to_domain).transpose()
    }

    /// Page through a user's jobs, newest first. Returns the page and the total count.
    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
        status: Option<ExportJobStatus>,
    ) -> Result<(Vec<ExportJob>, i64), StorageError> {
        let status = status.map(|s| s.as_str());

        let timer = QueryTimer::new("count_export_jobs_by_user");
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM export_jobs
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        let total = total?;

        let timer = QueryTimer::new("list_export_jobs_by_user");
        let entities = sqlx::query_as::<_, ExportJobEntity>(
            r#"
            SELECT id, user_id, name, data_types, filters, format, scheduling,
                   status, progress, file_path, file_size, error_message,
                   created_at, completed_at, expires_at
            FROM export_jobs
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await;
        timer.record();

        let jobs = entities?
            .into_iter()
            .map(entity_to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((jobs, total))
    }

    /// Delete a job, optionally restricted to one owner. Returns the deleted row.
    pub async fn delete(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
    ) -> Result<Option<ExportJob>, StorageError> {
        let timer = QueryTimer::new("delete_export_job");
        let result = sqlx::query_as::<_, ExportJobEntity>(
            r#"
            DELETE FROM export_jobs
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            RETURNING id, user_id, name, data_types, filters, format, scheduling,
                      status, progress, file_path, file_size, error_message,
                      created_at, completed_at, expires_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result?.map(entity_to_domain).transpose()
    }

    /// Completed jobs past their expiry that still reference a file.
    pub async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<ExportJob>, StorageError> {
        let timer = QueryTimer::new("find_expired_export_jobs");
        let result = sqlx::query_as::<_, ExportJobEntity>(
            r#"
            SELECT id, user_id, name, data_types, filters, format, scheduling,
                   status, progress, file_path, file_size, error_message,
                   created_at, completed_at, expires_at
            FROM export_jobs
            WHERE status = 'completed' AND expires_at < $1 AND file_path IS NOT NULL
            ORDER BY expires_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        result?.into_iter().map(entity_to_domain).collect()
    }
}

/// Oldest pending jobs, at most `limit`.
pub async fn list_pending_jobs<'e, E>(executor: E, limit: i64) -> Result<Vec<ExportJob>, StorageError>
where
    E: PgExecutor<'e>,
{
    let timer = QueryTimer::new("list_pending_export_jobs");
    let result = sqlx::query_as::<_, ExportJobEntity>(
        r#"
        SELECT id, user_id, name, data_types, filters, format, scheduling,
               status, progress, file_path, file_size, error_message,
               created_at, completed_at, expires_at
        FROM export_jobs
        WHERE status = 'pending'
        ORDER BY created_at ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(executor)
    .await;
    timer.record();

    result?.into_iter().map(entity_to_domain).collect()
}

/// Builds the partial `UPDATE` for a patch.
///
/// Only `Some` fields are written. Progress never decreases, and a status
/// change only applies when the row is in one of the new status's
/// predecessors.
pub fn build_update_query(id: Uuid, update: &ExportJobUpdate) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new("UPDATE export_jobs SET ");

    {
        let mut set = builder.separated(", ");
        if let Some(status) = update.status {
            set.push("status = ");
            set.push_bind_unseparated(status.as_str());
        }
        if let Some(progress) = update.progress {
            set.push("progress = GREATEST(progress, ");
            set.push_bind_unseparated(progress);
            set.push_unseparated(")");
        }
        if let Some(file_path) = &update.file_path {
            set.push("file_path = ");
            set.push_bind_unseparated(file_path.clone());
        }
        if let Some(file_size) = update.file_size {
            set.push("file_size = ");
            set.push_bind_unseparated(file_size);
        }
        if let Some(error_message) = &update.error_message {
            set.push("error_message = ");
            set.push_bind_unseparated(error_message.clone());
        }
        if let Some(completed_at) = update.completed_at {
            set.push("completed_at = ");
            set.push_bind_unseparated(completed_at);
        }
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    if let Some(status) = update.status {
        let allowed: Vec<String> = status
            .predecessors()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        builder.push(" AND status = ANY(");
        builder.push_bind(allowed);
        builder.push(")");
    }

    builder.push(" RETURNING ");
    builder.push(EXPORT_JOB_COLUMNS);
    builder
}

/// Apply a partial update.
///
/// Returns `None` when the job does not exist or the status guard rejected
/// the transition. An empty patch is refused.
pub async fn update_job<'e, E>(
    executor: E,
    id: Uuid,
    update: &ExportJobUpdate,
) -> Result<Option<ExportJob>, StorageError>
where
    E: PgExecutor<'e>,
{
    if update.is_empty() {
        return Err(StorageError::Validation(
            "export job update contains no fields".to_string(),
        ));
    }

    let mut builder = build_update_query(id, update);

    let timer = QueryTimer::new("update_export_job");
    let result = builder
        .build_query_as::<ExportJobEntity>()
        .fetch_optional(executor)
        .await;
    timer.record();

    result?.map(entity_to_domain).transpose()
}

fn entity_to_domain(entity: ExportJobEntity) -> Result<ExportJob, StorageError> {
    let status = entity
        .status
        .parse::<ExportJobStatus>()
        .map_err(StorageError::Decode)?;
    let format = entity
        .format
        .parse::<ExportFormat>()
        .map_err(StorageError::Decode)?;
    let data_types: DataTypes = serde_json::from_value(entity.data_types)
        .map_err(|e| StorageError::Decode(format!("data_types: {}", e)))?;
    let scheduling: Scheduling = serde_json::from_value(entity.scheduling)
        .map_err(|e| StorageError::Decode(format!("scheduling: {}", e)))?;

    Ok(ExportJob {
        id: entity.id,
        user_id: entity.user_id,
        name: entity.name,
        data_types,
        filters: entity.filters,
        format,
        scheduling,
        status,
        progress: entity.progress,
        file_path: entity.file_path,
        file_size: entity.file_size,
        error_message: entity.error_message,
        created_at: entity.created_at,
        completed_at: entity.completed_at,
        expires_at: entity.expires_at,
    })
}
