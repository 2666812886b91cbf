use async_trait::async_trait;
use opentelemetry::Context;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    cep::Cep,
    error::{PipelineError, Upstream},
    model::Location,
    telemetry::Telemetry,
};

use super::{GeocodeProvider, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://viacep.com.br";

/// Geocoder backed by the public ViaCEP service.
#[derive(Debug, Clone)]
pub struct ViaCepProvider {
    base_url: String,
    http: Client,
    telemetry: Telemetry,
}

impl ViaCepProvider {
    pub fn new(http: Client, telemetry: Telemetry) -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string(), http, telemetry }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    #[serde(default)]
    erro: Option<ErroFlag>,
}

/// ViaCEP has sent both `"erro": true` and `"erro": "true"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErroFlag {
    Bool(bool),
    Text(String),
}

impl ViaCepResponse {
    fn is_not_found(&self) -> bool {
        let flagged = match &self.erro {
            Some(ErroFlag::Bool(b)) => *b,
            Some(ErroFlag::Text(s)) => s.eq_ignore_ascii_case("true"),
            None => false,
        };
        flagged || self.localidade.trim().is_empty()
    }
}

#[async_trait]
impl GeocodeProvider for ViaCepProvider {
    async fn locate(&self, cep: &Cep, cx: &Context) -> Result<Location, PipelineError> {
        let url = format!("{}/ws/{}/json/", self.base_url, cep);
        debug!(%cep, "querying ViaCEP");

        let res = self
            .http
            .get(&url)
            .headers(self.telemetry.inject(cx).to_headers())
            .send()
            .await
            .map_err(|e| PipelineError::unavailable(Upstream::Geocode, e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| PipelineError::unavailable(Upstream::Geocode, e))?;

        if !status.is_success() {
            if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
                return Err(PipelineError::not_found(format!("ViaCEP answered {status}")));
            }
            warn!(%cep, %status, "ViaCEP request failed");
            return Err(PipelineError::protocol(
                Upstream::Geocode,
                Some(status.as_u16()),
                truncate_body(&body),
            ));
        }

        let parsed: ViaCepResponse = serde_json::from_str(&body).map_err(|e| {
            PipelineError::protocol(
                Upstream::Geocode,
                Some(status.as_u16()),
                format!("failed to parse ViaCEP JSON: {e}"),
            )
        })?;

        if parsed.is_not_found() {
            return Err(PipelineError::not_found(format!("ViaCEP has no entry for {cep}")));
        }

        Ok(Location { city: parsed.localidade, region: parsed.uf })
    }
}
