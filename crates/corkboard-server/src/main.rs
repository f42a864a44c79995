mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use corkboard_api::AppStateInner;
use corkboard_backup::{BackupEngine, run_scheduler};
use corkboard_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                concat!(
                    "corkboard_server=info,corkboard_api=info,",
                    "corkboard_backup=info,corkboard_db=info,tower_http=debug",
                )
                .into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(Database::open(&config.db_path)?);
    let backups = Arc::new(BackupEngine::new(db.clone(), config.backup_dir.clone())?);

    let shutdown = CancellationToken::new();
    let scheduler = tokio::spawn(run_scheduler(
        backups.clone(),
        config.schedule.clone(),
        shutdown.clone(),
    ));

    let state = Arc::new(AppStateInner {
        db: db.clone(),
        backups,
        retention: config.schedule.retention,
    });

    let mut app = corkboard_api::router(state);
    if config.static_dir.is_dir() {
        info!("Serving static files from {}", config.static_dir.display());
        app = app.fallback_service(ServeDir::new(&config.static_dir));
    }
    let app = app
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Corkboard listening on {}", addr);
    info!("Message store: {}", config.db_path.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let an in-flight backup finish before the store goes away
    shutdown.cancel();
    if let Err(e) = scheduler.await {
        warn!("Backup scheduler ended abnormally: {}", e);
    }

    match Arc::try_unwrap(db) {
        Ok(db) => db.close()?,
        Err(_) => warn!("Database still shared at shutdown; dropping without explicit close"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
