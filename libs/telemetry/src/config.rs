use std::env;

/// Shape of the stdout log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtlpProtocol {
    Grpc,
    HttpProtobuf,
}

/// Where spans go when OTLP export is switched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtlpExport {
    pub endpoint: String,
    pub protocol: OtlpProtocol,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub log_format: LogFormat,
    /// `None` unless `ENABLE_OTEL` is set and an endpoint is configured.
    pub export: Option<OtlpExport>,
}

impl TelemetryConfig {
    pub fn from_env(service_name: &str, service_version: &str) -> Self {
        Self::from_lookup(service_name, service_version, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(service_name: &str, service_version: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key).is_some_and(|value| {
                matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            })
        };

        let log_format = match lookup("LOG_FORMAT")
            .map(|value| value.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("text" | "pretty" | "plain") => LogFormat::Text,
            _ => LogFormat::Json,
        };

        let export = lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
            .map(|endpoint| endpoint.trim().to_string())
            .filter(|endpoint| !endpoint.is_empty() && flag("ENABLE_OTEL"))
            .map(|endpoint| OtlpExport {
                endpoint,
                protocol: match lookup("OTEL_EXPORTER_OTLP_PROTOCOL")
                    .map(|value| value.trim().to_ascii_lowercase())
                    .as_deref()
                {
                    Some("http" | "http/protobuf") => OtlpProtocol::HttpProtobuf,
                    _ => OtlpProtocol::Grpc,
                },
            });

        Self {
            service_name: lookup("OTEL_SERVICE_NAME").unwrap_or_else(|| service_name.to_string()),
            service_version: lookup("OTEL_SERVICE_VERSION")
                .unwrap_or_else(|| service_version.to_string()),
            environment: lookup("DEPLOYMENT_ENV").unwrap_or_else(|| "dev".into()),
            log_format,
            export,
        }
    }
}
