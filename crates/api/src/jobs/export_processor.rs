//! Export processor.
//!
//! A long-lived poll loop that claims pending export jobs and runs each one
//! on its own task: mark processing, normalize filters, collect, render,
//! record the result. Shutdown stops polling and drains in-flight jobs.

use chrono::Utc;
use domain::models::{
    ExportJob, ExportJobUpdate, PROGRESS_COLLECTED, PROGRESS_RENDERED,
};
use domain::services::normalize_filters;
use persistence::{ExportSession, ExportStorage, StorageError};
use shared::naming::export_file_stem;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::middleware::metrics::{
    record_export_completed, record_export_failed, set_exports_in_flight,
};
use crate::services::{collect_dataset, render_export, ExportProcessingError, RenderError, RenderedFile};

/// Tuning knobs of the processor.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub poll_interval: Duration,
    /// Pending jobs claimed per poll.
    pub batch_size: i64,
    /// Bound on the data collection phase of one job.
    pub collection_timeout: Duration,
    pub connect_attempts: u32,
    /// Per-attempt bound on connection acquisition.
    pub connect_timeout: Duration,
    pub backoff_base: Duration,
    pub drain_check_interval: Duration,
    pub output_dir: PathBuf,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            batch_size: 5,
            collection_timeout: Duration::from_secs(300),
            connect_attempts: 3,
            connect_timeout: Duration::from_secs(5),
            backoff_base: Duration::from_secs(2),
            drain_check_interval: Duration::from_secs(1),
            output_dir: PathBuf::from("exports"),
        }
    }
}

/// Delay before retrying after failed attempt `attempt` (1-based).
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Ids of jobs currently being processed.
#[derive(Debug, Default)]
struct InFlightSet {
    ids: Mutex<HashSet<Uuid>>,
}

impl InFlightSet {
    fn ids(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `id` in flight; `None` if it already is.
    fn claim(self: &Arc<Self>, id: Uuid) -> Option<InFlightGuard> {
        let mut ids = self.ids();
        if !ids.insert(id) {
            return None;
        }
        set_exports_in_flight(ids.len());
        Some(InFlightGuard {
            set: Arc::clone(self),
            id,
        })
    }

    fn len(&self) -> usize {
        self.ids().len()
    }
}

/// Removes its id from the in-flight set when dropped, including on panic.
struct InFlightGuard {
    set: Arc<InFlightSet>,
    id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut ids = self.set.ids();
        ids.remove(&self.id);
        set_exports_in_flight(ids.len());
    }
}

enum JobOutcome {
    Completed(RenderedFile),
    /// The job was no longer pending when we tried to claim it.
    Skipped,
}

struct Inner<S> {
    storage: S,
    settings: ProcessorSettings,
    running: AtomicBool,
    in_flight: Arc<InFlightSet>,
    shutdown_tx: watch::Sender<bool>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

/// Background export processor. Cheap to clone; clones share state.
pub struct ExportProcessor<S: ExportStorage> {
    inner: Arc<Inner<S>>,
}

impl<S: ExportStorage> Clone for ExportProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ExportStorage> ExportProcessor<S> {
    pub fn new(storage: S, settings: ProcessorSettings) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                storage,
                settings,
                running: AtomicBool::new(false),
                in_flight: Arc::new(InFlightSet::default()),
                shutdown_tx,
                poll_task: Mutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.inner.settings
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Starts the poll loop: one poll immediately, then one per interval.
    /// Calling `start` on a running processor does nothing.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            info!("Export processor already running");
            return;
        }

        self.inner.shutdown_tx.send_replace(false);
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();
        let processor = self.clone();
        let poll_interval = self.inner.settings.poll_interval;

        info!(
            poll_interval_secs = poll_interval.as_secs(),
            batch_size = self.inner.settings.batch_size,
            "Export processor started"
        );

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let start = Instant::now();
                        tokio::select! {
                            result = processor.poll_once() => match result {
                                Ok(dispatched) if dispatched > 0 => info!(
                                    dispatched = dispatched,
                                    elapsed_ms = start.elapsed().as_millis() as u64,
                                    "Dispatched export jobs"
                                ),
                                Ok(_) => debug!("No pending export jobs"),
                                Err(e) => warn!(
                                    error = %e,
                                    elapsed_ms = start.elapsed().as_millis() as u64,
                                    "Export poll abandoned, retrying on next tick"
                                ),
                            },
                            _ = shutdown_rx.changed() => break,
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Export poll loop stopped");
        });

        *self
            .inner
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Stops polling, then waits until every in-flight job has finished.
    pub async fn stop(&self) {
        if self.inner.running.swap(false, Ordering::SeqCst) {
            info!("Stopping export processor");
            self.inner.shutdown_tx.send_replace(true);

            let task = self
                .inner
                .poll_task
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(task) = task {
                if let Err(e) = task.await {
                    warn!(error = %e, "Export poll loop ended abnormally");
                }
            }
        }

        self.drain().await;
        info!("Export processor stopped");
    }

    async fn drain(&self) {
        loop {
            let remaining = self.in_flight_count();
            if remaining == 0 {
                return;
            }
            info!(remaining = remaining, "Waiting for in-flight export jobs");
            tokio::time::sleep(self.inner.settings.drain_check_interval).await;
        }
    }

    /// Runs one poll: fetches up to `batch_size` pending jobs and dispatches
    /// each one not already in flight. Returns the number dispatched.
    ///
    /// Dispatched jobs run on their own tasks; this does not wait for them.
    pub async fn poll_once(&self) -> Result<usize, ExportProcessingError> {
        let jobs = {
            let mut session = self.acquire_with_retry().await?;
            session.list_pending(self.inner.settings.batch_size).await?
        };

        let mut dispatched = 0;
        for job in jobs {
            let Some(guard) = self.inner.in_flight.claim(job.id) else {
                debug!(export_id = %job.id, "Export job already in flight");
                continue;
            };

            let processor = self.clone();
            tokio::spawn(async move {
                let _guard = guard;
                processor.process_job(job).await;
            });
            dispatched += 1;
        }

        Ok(dispatched)
    }

    async fn acquire_with_retry(&self) -> Result<S::Session, ExportProcessingError> {
        let settings = &self.inner.settings;
        let attempts = settings.connect_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match tokio::time::timeout(settings.connect_timeout, self.inner.storage.acquire()).await
            {
                Ok(Ok(session)) => {
                    if attempt > 1 {
                        info!(attempt = attempt, "Database connection established");
                    }
                    return Ok(session);
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = StorageError::ConnectTimeout.to_string(),
            }

            warn!(
                attempt = attempt,
                max_attempts = attempts,
                error = %last_error,
                "Database connection attempt failed"
            );

            if attempt < attempts {
                tokio::time::sleep(backoff_delay(settings.backoff_base, attempt)).await;
            }
        }

        Err(ExportProcessingError::ConnectionExhausted {
            attempts,
            message: last_error,
        })
    }

    async fn process_job(&self, job: ExportJob) {
        let start = Instant::now();
        let export_id = job.id;

        let mut session = match self.acquire_with_retry().await {
            Ok(session) => session,
            Err(e) => {
                // Still pending; the next poll picks it up again.
                error!(export_id = %export_id, error = %e, "No connection for export job");
                return;
            }
        };

        info!(
            export_id = %export_id,
            name = %job.name,
            format = %job.format,
            "Processing export job"
        );

        match self.run_job(&mut session, &job).await {
            Ok(JobOutcome::Completed(file)) => {
                record_export_completed(job.format, file.size);
                info!(
                    export_id = %export_id,
                    file_path = %file.path.display(),
                    file_size = file.size,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Export job completed"
                );
            }
            Ok(JobOutcome::Skipped) => {
                info!(export_id = %export_id, "Export job no longer pending, skipped");
            }
            Err(e) => {
                record_export_failed(job.format);
                error!(
                    export_id = %export_id,
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Export job failed"
                );
                self.record_failure(&mut session, export_id, &e).await;
            }
        }
    }

    async fn run_job(
        &self,
        session: &mut S::Session,
        job: &ExportJob,
    ) -> Result<JobOutcome, ExportProcessingError> {
        if session
            .update_job(job.id, &ExportJobUpdate::processing())
            .await?
            .is_none()
        {
            return Ok(JobOutcome::Skipped);
        }

        let now = Utc::now();
        let raw = job
            .raw_filters()
            .map_err(|e| ExportProcessingError::InvalidJob(format!("Invalid filters: {}", e)))?;
        let filters = normalize_filters(&raw, now)
            .map_err(|e| ExportProcessingError::InvalidJob(e.message().to_string()))?;

        let collect_start = Instant::now();
        let dataset = tokio::time::timeout(
            self.inner.settings.collection_timeout,
            collect_dataset(job.id, &mut *session, &job.data_types, &filters),
        )
        .await
        .map_err(|_| ExportProcessingError::CollectionTimeout)??;

        info!(
            export_id = %job.id,
            records = dataset.total_records(),
            elapsed_ms = collect_start.elapsed().as_millis() as u64,
            "Export data collected"
        );
        advance(session, job.id, ExportJobUpdate::progress(PROGRESS_COLLECTED)).await?;

        let file_stem = export_file_stem(&job.name, now, &job.id.to_string());
        let output_dir = self.inner.settings.output_dir.clone();
        let format = job.format;
        let rendered = tokio::task::spawn_blocking(move || {
            render_export(&dataset, format, &output_dir, &file_stem, now)
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))??;

        advance(session, job.id, ExportJobUpdate::progress(PROGRESS_RENDERED)).await?;

        let file_size = i64::try_from(rendered.size).unwrap_or(i64::MAX);
        advance(
            session,
            job.id,
            ExportJobUpdate::completed(
                rendered.path.to_string_lossy().into_owned(),
                file_size,
                Utc::now(),
            ),
        )
        .await?;

        Ok(JobOutcome::Completed(rendered))
    }

    /// Best-effort write of the failed status. A transient error on the job's
    /// own connection gets one retry on a fresh one.
    async fn record_failure(
        &self,
        session: &mut S::Session,
        export_id: Uuid,
        err: &ExportProcessingError,
    ) {
        let update = ExportJobUpdate::failed(err.to_string());

        let result = match session.update_job(export_id, &update).await {
            Err(e) if e.is_transient() => {
                warn!(export_id = %export_id, error = %e, "Retrying failure write on a fresh connection");
                match tokio::time::timeout(
                    self.inner.settings.connect_timeout,
                    self.inner.storage.acquire(),
                )
                .await
                {
                    Ok(Ok(mut fresh)) => fresh.update_job(export_id, &update).await,
                    Ok(Err(acquire_err)) => Err(acquire_err),
                    Err(_) => Err(StorageError::ConnectTimeout),
                }
            }
            other => other,
        };

        match result {
            Ok(Some(_)) => {}
            Ok(None) => warn!(
                export_id = %export_id,
                "Export job was removed before its failure could be recorded"
            ),
            Err(e) => error!(
                export_id = %export_id,
                error = %e,
                "Failed to record export job failure; job left in its last state"
            ),
        }
    }
}

/// Applies a progress or status update that must find the job.
async fn advance<T: ExportSession + ?Sized>(
    session: &mut T,
    id: Uuid,
    update: ExportJobUpdate,
) -> Result<ExportJob, ExportProcessingError> {
    session.update_job(id, &update).await?.ok_or_else(|| {
        ExportProcessingError::InvalidJob(format!(
            "Export job {} was removed or finalized during processing",
            id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let base = Duration::from_secs(2);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(8));
    }

    #[test]
    fn test_default_settings() {
        let settings = ProcessorSettings::default();
        assert_eq!(settings.poll_interval, Duration::from_secs(30));
        assert_eq!(settings.batch_size, 5);
        assert_eq!(settings.collection_timeout, Duration::from_secs(300));
        assert_eq!(settings.connect_attempts, 3);
    }

    #[test]
    fn test_in_flight_claim_is_exclusive() {
        let set = Arc::new(InFlightSet::default());
        let id = Uuid::new_v4();

        let guard = set.claim(id).expect("first claim succeeds");
        assert!(set.claim(id).is_none());
        assert_eq!(set.len(), 1);

        drop(guard);
        assert_eq!(set.len(), 0);
        assert!(set.claim(id).is_some());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let set = Arc::new(InFlightSet::default());
        let id = Uuid::new_v4();
        let claimed = Arc::clone(&set);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = claimed.claim(id);
            panic!("render blew up");
        }));

        assert!(result.is_err());
        assert_eq!(set.len(), 0);
    }
}
