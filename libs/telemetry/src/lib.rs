//! Logging and tracing bootstrap for the frame action proxy.
//!
//! Structured `tracing` output goes to stdout (JSON unless `LOG_FORMAT=text`), filtered by
//! `RUST_LOG`. Spans are additionally exported over OTLP when `ENABLE_OTEL` is set together with
//! an exporter endpoint.

use anyhow::Result;

mod config;
mod tracing_init;

pub use config::{LogFormat, OtlpExport, OtlpProtocol, TelemetryConfig};
pub use tracing_init::{TelemetryGuard, init_telemetry};

/// Installs the subscriber configured from the process environment.
pub fn install(service_name: &str, service_version: &str) -> Result<TelemetryGuard> {
    init_telemetry(&TelemetryConfig::from_env(service_name, service_version))
}
