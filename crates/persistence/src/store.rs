//! Storage seam used by the export processor.
//!
//! The processor borrows one session per poll and per job. A session owns a
//! pooled connection, which goes back to the pool when the session is dropped.

use async_trait::async_trait;
use domain::models::{ApplicationRecord, CanonicalFilterSet, ExportJob, ExportJobUpdate};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::error::StorageError;
use crate::repositories::application_export::fetch_application_records;
use crate::repositories::export_job::{list_pending_jobs, update_job};

/// Source of storage sessions.
#[async_trait]
pub trait ExportStorage: Send + Sync + 'static {
    type Session: ExportSession + 'static;

    /// Borrow a session. Implementations should fail fast; the caller applies
    /// its own timeout and retry policy.
    async fn acquire(&self) -> Result<Self::Session, StorageError>;
}

/// Operations the processor performs against the job store and data sources.
#[async_trait]
pub trait ExportSession: Send {
    /// Oldest pending jobs, at most `limit`.
    async fn list_pending(&mut self, limit: i64) -> Result<Vec<ExportJob>, StorageError>;

    /// Partial update; `None` if the job is gone or the transition was refused.
    async fn update_job(
        &mut self,
        id: Uuid,
        update: &ExportJobUpdate,
    ) -> Result<Option<ExportJob>, StorageError>;

    /// Filtered, joined application rows.
    async fn fetch_applications(
        &mut self,
        filters: &CanonicalFilterSet,
    ) -> Result<Vec<ApplicationRecord>, StorageError>;
}

/// PostgreSQL-backed storage.
#[derive(Clone)]
pub struct PgExportStorage {
    pool: PgPool,
}

impl PgExportStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ExportStorage for PgExportStorage {
    type Session = PgExportSession;

    async fn acquire(&self) -> Result<Self::Session, StorageError> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(StorageError::from_acquire)?;
        Ok(PgExportSession { conn })
    }
}

/// One pooled connection.
pub struct PgExportSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl ExportSession for PgExportSession {
    async fn list_pending(&mut self, limit: i64) -> Result<Vec<ExportJob>, StorageError> {
        list_pending_jobs(&mut *self.conn, limit).await
    }

    async fn update_job(
        &mut self,
        id: Uuid,
        update: &ExportJobUpdate,
    ) -> Result<Option<ExportJob>, StorageError> {
        update_job(&mut *self.conn, id, update).await
    }

    async fn fetch_applications(
        &mut self,
        filters: &CanonicalFilterSet,
    ) -> Result<Vec<ApplicationRecord>, StorageError> {
        fetch_application_records(&mut *self.conn, filters).await
    }
}
