//! Environment-driven configuration for both processes.
//!
//! Every loader has a `from_lookup` form taking the variable source as a
//! closure, so tests never touch the process environment.

use crate::telemetry::TelemetryConfig;

pub const ENV_LISTEN_ADDR: &str = "LISTEN_ADDR";
pub const ENV_RESOLVER_URL: &str = "RESOLVER_URL";
pub const ENV_WEATHER_API_KEY: &str = "WEATHER_API_KEY";
pub const ENV_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
pub const ENV_OTEL_DISABLED: &str = "OTEL_SDK_DISABLED";

pub const DEFAULT_GATEWAY_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_RESOLVER_ADDR: &str = "0.0.0.0:8081";
pub const DEFAULT_RESOLVER_URL: &str = "http://weather-resolver:8081";

pub const GATEWAY_SERVICE_NAME: &str = "weather-gateway";
pub const RESOLVER_SERVICE_NAME: &str = "weather-resolver";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub listen_addr: String,
    /// Base URL of the resolver; `/cep` is appended.
    pub resolver_url: String,
    pub telemetry: TelemetryConfig,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            listen_addr: var(&lookup, ENV_LISTEN_ADDR)
                .unwrap_or_else(|| DEFAULT_GATEWAY_ADDR.to_string()),
            resolver_url: var(&lookup, ENV_RESOLVER_URL)
                .unwrap_or_else(|| DEFAULT_RESOLVER_URL.to_string()),
            telemetry: telemetry_from_lookup(GATEWAY_SERVICE_NAME, &lookup),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub listen_addr: String,
    /// WeatherAPI key. Absent keys fail each request, not startup.
    pub weather_api_key: Option<String>,
    pub telemetry: TelemetryConfig,
}

impl std::fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("listen_addr", &self.listen_addr)
            .field("weather_api_key", &self.weather_api_key.as_ref().map(|_| "<redacted>"))
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            listen_addr: var(&lookup, ENV_LISTEN_ADDR)
                .unwrap_or_else(|| DEFAULT_RESOLVER_ADDR.to_string()),
            weather_api_key: var(&lookup, ENV_WEATHER_API_KEY),
            telemetry: telemetry_from_lookup(RESOLVER_SERVICE_NAME, &lookup),
        }
    }
}

fn telemetry_from_lookup(
    service_name: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> TelemetryConfig {
    let mut config = TelemetryConfig::new(service_name);
    if let Some(endpoint) = var(lookup, ENV_OTLP_ENDPOINT) {
        config.endpoint = endpoint;
    }
    config.enabled = !var(lookup, ENV_OTEL_DISABLED)
        .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");
    config
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Blank values count as unset.
fn var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
