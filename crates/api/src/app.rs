use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use persistence::repositories::ExportJobRepository;
use persistence::PgExportStorage;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::jobs::ExportProcessor;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{exports, health};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jobs: ExportJobRepository,
    /// `None` when the processor is disabled for this instance.
    pub processor: Option<ExportProcessor<PgExportStorage>>,
}

pub fn create_app(
    config: Config,
    pool: PgPool,
    processor: Option<ExportProcessor<PgExportStorage>>,
) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        jobs: ExportJobRepository::new(pool.clone()),
        pool,
        config: config.clone(),
        processor,
    };

    // Empty origin list allows any origin (development)
    let cors = if config.server.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Caller identity comes from the X-User-* headers set upstream
    let export_routes = Router::new()
        .route(
            "/api/v1/exports",
            post(exports::create_export).get(exports::list_exports),
        )
        .route(
            "/api/v1/exports/:id",
            get(exports::get_export_status).delete(exports::delete_export),
        )
        .route(
            "/api/v1/exports/:id/download",
            get(exports::download_export),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(export_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
