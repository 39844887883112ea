pub mod config;
pub mod http;
mod main_logic;

use std::sync::Arc;

use anyhow::{Context, Result};
use frames_core::{FrameActionProxy, HtmlFrameExtractor, ReqwestUpstreamClient};
pub use main_logic::run;

use crate::config::ProxyConfig;

/// Builds the production proxy: reqwest upstream client plus the HTML meta-tag extractor.
pub fn build_proxy(config: &ProxyConfig) -> Result<FrameActionProxy> {
    let upstream = ReqwestUpstreamClient::new(&config.upstream_settings())
        .context("failed to build upstream HTTP client")?;
    Ok(FrameActionProxy::new(
        Arc::new(upstream),
        Arc::new(HtmlFrameExtractor),
    ))
}

/// Convenience to build the router with the production proxy.
pub fn build_router(config: &ProxyConfig) -> Result<axum::Router> {
    Ok(http::build_router(config, build_proxy(config)?))
}
