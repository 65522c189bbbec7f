mod cleanup;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use arbor_api::auth::{AppState, AppStateInner};
use arbor_api::routes::router;
use arbor_api::storage::Storage;
use arbor_db::Database;

const SESSION_SWEEP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arbor=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("ARBOR_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("ARBOR_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("ARBOR_DB_PATH")
        .unwrap_or_else(|_| "arbor.db".into())
        .into();
    let upload_dir: PathBuf = std::env::var("ARBOR_UPLOAD_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();
    let session_ttl_hours: i64 = std::env::var("ARBOR_SESSION_TTL_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(24);

    // Init database and upload storage
    let db = Database::open(&db_path)?;
    let storage = Storage::new(upload_dir).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        session_ttl_hours,
    });

    // Background sweep for expired sessions (runs every hour)
    tokio::spawn(cleanup::run_session_sweep(
        state.clone(),
        SESSION_SWEEP_INTERVAL_SECS,
    ));

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Arbor forum server listening on {}", addr);
    info!("Session TTL: {} hours", session_ttl_hours);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
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
