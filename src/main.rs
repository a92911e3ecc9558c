use std::net::SocketAddr;

use smsgate::config::AppConfig;
use smsgate::routes::router;
use smsgate::state::AppState;
use smsgate::telemetry::init_tracing;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);
    config.validate()?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let environment = config.environment;

    let state = AppState::from_config(config);
    if !state.gate.is_enabled() {
        warn!("API_SECRET_KEY not set; gated endpoints accept unauthenticated requests (development mode)");
    }

    tokio::spawn(state.limiter.clone().cleanup_task());

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, ?environment, "SMS gateway listening");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("SMS gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
