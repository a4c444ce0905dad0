use anyhow::Result;
use persistence::PgExportStorage;
use tracing::{info, warn};

use training_portal_api::{
    app, config,
    jobs::ExportProcessor,
    middleware::{init_metrics, logging::init_logging},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    init_logging(&config.logging)?;
    init_metrics()?;

    info!("Starting Training Portal API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let processor = if config.export.enabled {
        let processor = ExportProcessor::new(
            PgExportStorage::new(pool.clone()),
            config.export.processor_settings(),
        );
        processor.start();
        Some(processor)
    } else {
        warn!("Export processor disabled; jobs will stay pending");
        None
    };

    let addr = config.socket_addr()?;
    let app = app::create_app(config, pool, processor.clone());

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(processor) = processor {
        processor.stop().await;
    }
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
