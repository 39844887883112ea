use anyhow::Result;
use frames_proxy::config::ProxyConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = frames_telemetry::install("frame-proxy", env!("CARGO_PKG_VERSION"))?;

    let result = match ProxyConfig::from_env() {
        Ok(config) => frames_proxy::run(config).await,
        Err(err) => Err(err),
    };

    telemetry.shutdown();
    result
}
