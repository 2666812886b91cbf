use async_trait::async_trait;
use opentelemetry::Context;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::{PipelineError, Upstream},
    model::{Location, TemperatureReading},
    telemetry::Telemetry,
};

use super::{WeatherProvider, truncate_body};

pub const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com";

/// Country appended to every `q` parameter.
pub const COUNTRY: &str = "BR";

#[derive(Clone)]
pub struct WeatherApiProvider {
    api_key: Option<String>,
    base_url: String,
    http: Client,
    telemetry: Telemetry,
}

impl std::fmt::Debug for WeatherApiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherApiProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl WeatherApiProvider {
    /// A missing or blank key is accepted here and reported per request.
    pub fn new(api_key: Option<String>, http: Client, telemetry: Telemetry) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http, telemetry }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    current: WaCurrent,
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn current_temperature(
        &self,
        location: &Location,
        cx: &Context,
    ) -> Result<TemperatureReading, PipelineError> {
        let Some(api_key) = self.api_key() else {
            return Err(PipelineError::MissingCredential {
                detail: Some("WEATHER_API_KEY is not set".to_string()),
            });
        };

        let url = format!("{}/v1/current.json", self.base_url);
        let q = format!("{},{},{COUNTRY}", location.city, location.region);
        debug!(city = %location.city, uf = %location.region, "querying WeatherAPI");

        let res = self
            .http
            .get(&url)
            .query(&[("key", api_key), ("q", q.as_str()), ("aqi", "no")])
            .headers(self.telemetry.inject(cx).to_headers())
            .send()
            .await
            .map_err(|e| PipelineError::unavailable(Upstream::Weather, e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| PipelineError::unavailable(Upstream::Weather, e))?;

        if !status.is_success() {
            warn!(%status, city = %location.city, "WeatherAPI request failed");
            return Err(PipelineError::protocol(
                Upstream::Weather,
                Some(status.as_u16()),
                truncate_body(&body),
            ));
        }

        let parsed: WaResponse = serde_json::from_str(&body).map_err(|e| {
            PipelineError::protocol(
                Upstream::Weather,
                Some(status.as_u16()),
                format!("failed to parse WeatherAPI JSON: {e}"),
            )
        })?;

        Ok(TemperatureReading { celsius: parsed.current.temp_c })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> Location {
        Location { city: "São Paulo".into(), region: "SP".into() }
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        // Unroutable base URL: reaching the network would surface as Unavailable.
        let provider = WeatherApiProvider::new(None, Client::new(), Telemetry::disabled("test"))
            .with_base_url("http://127.0.0.1:9");

        let err = provider.current_temperature(&location(), &Context::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn blank_key_counts_as_missing() {
        let provider = WeatherApiProvider::new(
            Some("   ".into()),
            Client::new(),
            Telemetry::disabled("test"),
        );

        let err = provider.current_temperature(&location(), &Context::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingCredential { .. }));
    }

    #[test]
    fn debug_redacts_key() {
        let provider = WeatherApiProvider::new(
            Some("super-secret".into()),
            Client::new(),
            Telemetry::disabled("test"),
        );
        let out = format!("{provider:?}");

        assert!(!out.contains("super-secret"));
        assert!(out.contains("<redacted>"));
    }
}
