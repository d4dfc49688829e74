//! Goobers Server - authoritative party platformer server
//!
//! This is the main entry point for the game server. It handles:
//! - WebSocket connections for phone controllers
//! - The game session task (physics, bombs, trivia, levels)
//! - HTTP endpoints for health, renderer snapshots and the operator signal

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::sync::Mutex;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use goobers_server::app::AppState;
use goobers_server::config::Config;
use goobers_server::game::{load_levels, GameSession, QuestionBank, ScoreStore};
use goobers_server::http::build_router;
use goobers_server::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config)?;

    // Initialize server time tracking
    init_server_time();

    info!("Starting Goobers Server");
    info!("Server address: {}", config.server_addr);

    // Level files and the question bank are operator configuration; any
    // failure here aborts startup
    let levels = load_levels(&config.levels_dir, &config.level_sequence)?;
    let bank = QuestionBank::load(&config.questions_path)?;
    let seed = config.seed.unwrap_or_else(rand::random);
    info!(levels = levels.len(), questions = bank.len(), seed, "Game content loaded");

    // Spawn the game session
    let (session, game) = GameSession::new(
        levels,
        bank,
        config.tuning.clone(),
        ScoreStore::new(config.scores_path.clone()),
        config.story_slides,
        seed,
    );
    tokio::spawn(session.run());

    // Create application state and router
    let addr: SocketAddr = config.server_addr;
    let state = AppState::new(config, game);
    let router = build_router(state);

    // Start server
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing: console output plus the fault log for warnings and errors
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let fault_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.fault_log_path)
        .with_context(|| format!("failed to open fault log {}", config.fault_log_path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(env_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(fault_log))
                .with_filter(LevelFilter::WARN),
        )
        .init();

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
