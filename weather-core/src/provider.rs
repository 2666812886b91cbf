use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use opentelemetry::Context;
use reqwest::Client;

use crate::{
    cep::Cep,
    error::PipelineError,
    model::{Location, TemperatureReading},
};

pub mod viacep;
pub mod weatherapi;

pub use viacep::ViaCepProvider;
pub use weatherapi::WeatherApiProvider;

/// Bound applied to every outbound call.
pub const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared client for all outbound calls of a process, so connections are pooled.
pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(OUTBOUND_TIMEOUT)
        .user_agent(concat!("weather-core/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Maps a postal code to a city and state.
#[async_trait]
pub trait GeocodeProvider: Send + Sync + Debug {
    /// `cx` is the span covering this lookup; its context goes out with the request.
    async fn locate(&self, cep: &Cep, cx: &Context) -> Result<Location, PipelineError>;
}

/// Maps a location to its current temperature.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_temperature(
        &self,
        location: &Location,
        cx: &Context,
    ) -> Result<TemperatureReading, PipelineError>;
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
