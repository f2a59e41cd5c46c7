mod cleanup;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use agora_api::{AppState, AppStateInner};
use agora_core::{Forum, ForumConfig, SystemClock, ToggleMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("AGORA_DB_PATH").unwrap_or_else(|_| "agora.db".into());
    let host = std::env::var("AGORA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("AGORA_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;
    let ttl_hours: u64 = std::env::var("AGORA_SESSION_TTL_HOURS")
        .unwrap_or_else(|_| "24".into())
        .parse()?;
    let sweep_secs: u64 = std::env::var("AGORA_SESSION_SWEEP_SECS")
        .unwrap_or_else(|_| "0".into())
        .parse()?;
    let atomic_votes: bool = std::env::var("AGORA_ATOMIC_VOTES")
        .unwrap_or_else(|_| "false".into())
        .parse()?;
    let admin_email = std::env::var("AGORA_ADMIN_EMAIL")
        .unwrap_or_else(|_| agora_core::DEFAULT_ADMIN_EMAIL.into());

    let db = Arc::new(agora_db::Database::open(&PathBuf::from(&db_path))?);

    let config = ForumConfig {
        session_ttl: Duration::from_secs(ttl_hours * 60 * 60),
        toggle_mode: if atomic_votes {
            ToggleMode::Atomic
        } else {
            ToggleMode::Sequential
        },
        admin_email,
    };
    info!(
        "Sessions last {}h, votes toggle in {:?} mode",
        ttl_hours, config.toggle_mode
    );
    let forum = Forum::new(db, Arc::new(SystemClock), config);

    if sweep_secs > 0 {
        tokio::spawn(cleanup::run_session_sweep(forum.sessions.clone(), sweep_secs));
        info!("Session sweep every {}s", sweep_secs);
    }

    let state: AppState = Arc::new(AppStateInner { forum });
    let app = agora_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Agora server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Agora server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
