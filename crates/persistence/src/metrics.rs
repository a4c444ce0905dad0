//! Query and pool metrics for the export job store.
//!
//! Every job store and application export query is timed under its own
//! `query` label. Pool gauges are refreshed when `/metrics` is scraped, so
//! the processor's dedicated connections show up next to request traffic.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Publishes active, idle and total connection counts for `pool`.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times one query. Started before the query runs and recorded once it
/// returns, whether it succeeded or not.
///
/// ```ignore
/// let timer = QueryTimer::new("list_pending_export_jobs");
/// let result = sqlx::query_as::<_, ExportJobEntity>(...).fetch_all(executor).await;
/// timer.record();
/// result?.into_iter().map(entity_to_domain).collect()
/// ```
pub struct QueryTimer {
    query_name: String,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(&self.query_name, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_keeps_export_query_label() {
        let timer = QueryTimer::new("update_export_job");
        assert_eq!(timer.query_name, "update_export_job");
        assert!(timer.start.elapsed().as_secs() < 1);
    }

    #[test]
    fn test_recording_without_exporter_is_noop() {
        QueryTimer::new(String::from("export_applications")).record();
        record_query_duration("find_expired_export_jobs", 0.25);
    }

    #[tokio::test]
    async fn test_pool_gauges_for_unconnected_pool() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        assert_eq!(pool.size(), 0);
        record_pool_metrics(&pool);
    }
}
