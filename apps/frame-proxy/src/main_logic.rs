use anyhow::Result;
use axum::serve;
use tokio::net::TcpListener;
use tracing::info;

use crate::build_router;
use crate::config::ProxyConfig;

/// Starts the proxy HTTP server using the provided configuration.
pub async fn run(config: ProxyConfig) -> Result<()> {
    let router = build_router(&config)?;
    let listener = TcpListener::bind(config.addr).await?;
    info!(
        route = %config.route,
        upstream_timeout_secs = config.upstream_timeout.as_secs(),
        "frame-proxy listening on {}",
        config.addr
    );

    serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    info!("frame-proxy stopped");
    Ok(())
}
