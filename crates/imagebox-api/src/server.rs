//! HTTP server.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

/// Server configuration.
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub router: Router,
}

/// Serve until Ctrl-C.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.listen_addr).await?;
    imagebox_telemetry::log_listening!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, config.router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    imagebox_telemetry::log_shutdown!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
