use std::net::SocketAddr;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tonepolish::{select_refiner, server, RefineConfig};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Serves `POST /api/refine` backed by a chat-completion API or the local refiner.
///
/// AI settings come from `AI_API_*` environment variables.
#[derive(Debug, Parser)]
#[command(name = "tonepolish-server", version)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "TONEPOLISH_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Browser origin allowed to call the API.
    #[arg(long, env = "TONEPOLISH_CORS_ORIGIN", default_value = "http://localhost:3000")]
    cors_origin: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = RefineConfig::from_env().context("failed to load AI configuration")?;
    let shutdown = CancellationToken::new();
    let refiner = select_refiner(&config, shutdown.clone())?;
    info!("using {} refiner (model: {})", refiner.name(), config.model);

    let origin = HeaderValue::from_str(&cli.cors_origin)
        .with_context(|| format!("invalid CORS origin '{}'", cli.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let app = server::router(refiner)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!("listening on http://{}", cli.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C and cancels pending retry backoffs.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
    shutdown.cancel();
}
