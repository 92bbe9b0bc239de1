use anyhow::Result;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smcvd_console::api::AppState;
use smcvd_console::build_router;
use smcvd_console::client::AnalysisClient;
use smcvd_console::config::{Config, Environment};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing (LOG_FORMAT=json for structured output)
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "smcvd_console=info,tower_http=info".into()),
    );
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = Config::from_env()?;
    if config.environment == Environment::Production && config.frontend_url.contains("localhost") {
        tracing::warn!("FRONTEND_URL points at localhost in production");
    }

    let client = AnalysisClient::new(&config.analysis_api_url, config.request_timeout())?;
    tracing::info!(
        api = %client.base_url(),
        interval_ms = config.poll_interval_ms,
        max_attempts = ?config.poll_max_attempts,
        "Analysis API client configured"
    );

    match client.ping().await {
        Ok(latency) => tracing::info!(latency_ms = latency.as_millis() as u64, "Analysis API reachable"),
        Err(e) => tracing::warn!(error = %e, "Analysis API not reachable yet, continuing"),
    }

    tracing::info!("CORS configured for origins: {}", config.frontend_url);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    let app = build_router(AppState::new(client, config));

    tracing::info!("Starting server on {}", addr);

    // Graceful shutdown handling
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
