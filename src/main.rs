use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bookshelf_api::config::{AppConfig, LogMode};
use bookshelf_api::database;
use bookshelf_api::router::{router, AppState, Storages};
use bookshelf_api::services::TokenService;

#[derive(Parser)]
#[command(name = "bookshelf-api")]
#[command(about = "Catalog service for books, authors, persons, publishers, tags and genres")]
#[command(version)]
struct Cli {
    /// Optional .env file loaded before reading the environment
    #[arg(long)]
    env: Option<PathBuf>,
}

fn init_tracing(mode: LogMode) {
    let default_level = match mode {
        LogMode::Debug => "debug",
        LogMode::Dev | LogMode::Prod => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match mode {
        LogMode::Prod => builder.json().init(),
        LogMode::Debug | LogMode::Dev => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(err = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match &cli.env {
        Some(path) => {
            dotenvy::from_path(path).with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    let config = AppConfig::from_env().context("failed to load configuration")?;
    init_tracing(config.app.log_mode);
    tracing::info!(mode = ?config.app.log_mode, "starting bookshelf api");

    let pool = database::connect(&config.database).await?;
    if config.database.run_migrations {
        database::run_migrations(&pool).await?;
    }

    let tokens = Arc::new(TokenService::new(&config.authorization)?);
    let state = AppState::new(
        Storages::postgres(pool.clone()),
        tokens,
        pool.clone(),
        config.authorization.password_hash_cost,
    );
    let app = router(state, &config.router);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    let shutdown_timeout = config.app.shutdown_timeout();
    tokio::select! {
        result = server => result.context("server error")?,
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!(timeout = ?shutdown_timeout, "graceful shutdown timed out");
        }
    }

    pool.close().await;
    tracing::info!("server stopped");
    Ok(())
}
