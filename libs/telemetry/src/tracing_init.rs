use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{ExporterBuildError, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing::warn;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, OtlpExport, OtlpProtocol, TelemetryConfig};

const DEFAULT_FILTER: &str = "info";

/// Keeps the span exporter alive for the lifetime of the process.
///
/// Call [`TelemetryGuard::shutdown`] after the server stops so buffered spans are flushed.
#[must_use = "the guard flushes exported spans on shutdown"]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    pub fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }

    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(err) = provider.shutdown() {
                warn!(error = %err, "failed to flush span exporter");
            }
        }
    }
}

/// Installs the global subscriber: stdout logs filtered by `RUST_LOG`, plus OTLP span export
/// when configured.
pub fn init_telemetry(cfg: &TelemetryConfig) -> Result<TelemetryGuard> {
    let provider = cfg
        .export
        .as_ref()
        .map(|export| -> Result<SdkTracerProvider> {
            let exporter = span_exporter(export)
                .with_context(|| format!("failed to build OTLP exporter for {}", export.endpoint))?;
            Ok(SdkTracerProvider::builder()
                .with_resource(resource(cfg))
                .with_batch_exporter(exporter)
                .build())
        })
        .transpose()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let logs = match cfg.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };
    let spans = provider
        .as_ref()
        .map(|provider| OpenTelemetryLayer::new(provider.tracer(cfg.service_name.clone())));

    tracing_subscriber::registry()
        .with(filter)
        .with(logs)
        .with(spans)
        .try_init()
        .context("global tracing subscriber already installed")?;

    Ok(TelemetryGuard { provider })
}

fn span_exporter(export: &OtlpExport) -> Result<SpanExporter, ExporterBuildError> {
    match export.protocol {
        OtlpProtocol::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(export.endpoint.as_str())
            .build(),
        OtlpProtocol::HttpProtobuf => SpanExporter::builder()
            .with_http()
            .with_endpoint(export.endpoint.as_str())
            .build(),
    }
}

fn resource(cfg: &TelemetryConfig) -> Resource {
    Resource::builder()
        .with_service_name(cfg.service_name.clone())
        .with_attributes([
            KeyValue::new("service.version", cfg.service_version.clone()),
            KeyValue::new("deployment.environment.name", cfg.environment.clone()),
        ])
        .build()
}
