//! Tracemark Server - REST API for recipient watermarking
//!
//! Exposes tracemark-core functionality via HTTP endpoints:
//! - POST /watermark/issue - Sign a payload and record it
//! - POST /watermark/embed - Embed a signed payload into a file
//! - POST /watermark/extract - Recover a payload from a file
//! - POST /forensic/verify - Judge a recovered payload against its record

use std::net::SocketAddr;
use std::process::ExitCode;

use tracemark_server::{create_router_with_config, Config};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();

    let config = Config::from_env();
    let addr = config.socket_addr();

    let app = match create_router_with_config(&config).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize server");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(%addr, docs = "/swagger-ui", "Tracemark server listening");

    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server terminated");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
