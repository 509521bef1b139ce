//! # Kre8 Backend - Main Application Entry Point
//!
//! HTTP backend for the Kre8 beat maker. It turns prompts into Strudel code, transcribes
//! spoken prompts, stores and searches track feedback, and hands out short-lived tokens for
//! realtime voice sessions. The heavy lifting happens at external providers; this server
//! validates input, holds the API keys and shapes the responses.
//!
//! ## Application Architecture:
//! - **config**: layered settings (defaults, `config.toml`, environment) and provider credentials
//! - **state**: shared application state, provider clients and metrics
//! - **validation**: request checks run before any provider is called
//! - **context**: optional listener context folded into generation prompts
//! - **providers**: HTTP clients for the generation, transcription and collection APIs
//! - **health**: service health and metrics endpoints
//! - **middleware**: request logging and metrics collection
//! - **handlers**: one module per route group under `/api`
//! - **error**: error types and the JSON error envelope

mod config;
mod context;
mod error;
mod handlers;
mod health;
mod middleware;
mod providers;
mod state;
mod validation;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use crate::config::{AppConfig, Credentials};
use crate::state::AppState;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    let credentials = Credentials::from_env();
    log_capabilities(&credentials);

    info!("Starting kre8-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);
    info!("Serving static content from {}", config.config_dir().display());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = web::Data::new(AppState::new(config, credentials)?);

    let shutdown = setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_headers(vec!["x-request-id"])
            .max_age(3600);

        // Middleware runs in reverse registration order on the way in
        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .configure(handlers::configure_routes)
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = wait_for_shutdown(shutdown) => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// `RUST_LOG` wins; otherwise debug for this crate and info for actix.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kre8_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Missing keys don't stop the server; the affected routes answer "not configured".
fn log_capabilities(credentials: &Credentials) {
    let groups = [
        ("music generation", credentials.generation_configured(), "XAI_API_KEY"),
        (
            "transcription",
            credentials.transcription_configured(),
            "WHISPER_API_KEY or OPENAI_API_KEY",
        ),
        (
            "feedback storage",
            credentials.feedback_configured(),
            "XAI_MANAGEMENT_API_KEY and XAI_PREFERENCES_COLLECTION_ID",
        ),
        (
            "feedback search",
            credentials.feedback_search_configured(),
            "XAI_API_KEY and XAI_PREFERENCES_COLLECTION_ID",
        ),
        ("realtime sessions", credentials.realtime_configured(), "XAI_API_KEY"),
    ];

    for (group, configured, needs) in groups {
        if configured {
            info!("{} enabled", group);
        } else {
            warn!("{} disabled: set {}", group, needs);
        }
    }
}

/// Listen for SIGTERM / SIGINT and flip the returned channel when one arrives.
fn setup_signal_handlers() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = tx.send(true);
    });

    rx
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to install signal handlers: {}", e);
                std::future::pending::<()>().await;
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            // Sender gone without a signal; keep serving
            std::future::pending::<()>().await;
        }
    }
}
