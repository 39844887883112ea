use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use frames_core::{DEFAULT_UPSTREAM_TIMEOUT, UpstreamSettings};

pub const DEFAULT_ROUTE: &str = "/frames";
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub addr: SocketAddr,
    pub route: String,
    pub upstream_timeout: Duration,
    pub user_agent: String,
    pub max_body_bytes: usize,
    pub max_upstream_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let upstream = UpstreamSettings::default();
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            route: DEFAULT_ROUTE.to_string(),
            upstream_timeout: upstream.timeout,
            user_agent: upstream.user_agent,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_upstream_bytes: upstream.max_body_bytes,
        }
    }
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = lookup("FRAME_PROXY_BIND_ADDR").unwrap_or_else(|| "0.0.0.0".into());
        let ip = IpAddr::from_str(bind_addr.trim()).context("invalid FRAME_PROXY_BIND_ADDR")?;
        let port = match lookup("FRAME_PROXY_PORT") {
            Some(raw) => raw.trim().parse::<u16>().context("invalid FRAME_PROXY_PORT")?,
            None => defaults.addr.port(),
        };

        let route = lookup("FRAME_PROXY_ROUTE").unwrap_or(defaults.route);
        if !route.starts_with('/') {
            bail!("FRAME_PROXY_ROUTE must start with `/`, got `{route}`");
        }

        let upstream_timeout = match lookup("FRAME_PROXY_UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .context("invalid FRAME_PROXY_UPSTREAM_TIMEOUT_SECS")?;
                if secs == 0 {
                    bail!("FRAME_PROXY_UPSTREAM_TIMEOUT_SECS must be greater than zero");
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_UPSTREAM_TIMEOUT,
        };

        let max_body_bytes = match lookup("FRAME_PROXY_MAX_BODY_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .context("invalid FRAME_PROXY_MAX_BODY_BYTES")?,
            None => defaults.max_body_bytes,
        };

        let max_upstream_bytes = match lookup("FRAME_PROXY_MAX_UPSTREAM_BYTES") {
            Some(raw) => {
                let bytes = raw
                    .trim()
                    .parse::<usize>()
                    .context("invalid FRAME_PROXY_MAX_UPSTREAM_BYTES")?;
                if bytes == 0 {
                    bail!("FRAME_PROXY_MAX_UPSTREAM_BYTES must be greater than zero");
                }
                bytes
            }
            None => defaults.max_upstream_bytes,
        };

        Ok(Self {
            addr: SocketAddr::new(ip, port),
            route,
            upstream_timeout,
            user_agent: lookup("FRAME_PROXY_USER_AGENT").unwrap_or(defaults.user_agent),
            max_body_bytes,
            max_upstream_bytes,
        })
    }

    pub fn upstream_settings(&self) -> UpstreamSettings {
        UpstreamSettings {
            timeout: self.upstream_timeout,
            user_agent: self.user_agent.clone(),
            max_body_bytes: self.max_upstream_bytes,
        }
    }
}
