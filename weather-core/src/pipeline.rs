//! Postal code → location → temperature → converted result.

use std::sync::Arc;

use opentelemetry::{Context, trace::SpanKind};
use tracing::debug;

use crate::{
    cep::Cep,
    convert::convert,
    error::PipelineError,
    model::{Location, TemperatureReading, WeatherResult},
    provider::{GeocodeProvider, WeatherProvider},
    telemetry::Telemetry,
};

/// Runs the lookups strictly in order and stops at the first failure.
#[derive(Debug, Clone)]
pub struct Pipeline {
    geocoder: Arc<dyn GeocodeProvider>,
    weather: Arc<dyn WeatherProvider>,
    telemetry: Telemetry,
}

impl Pipeline {
    pub fn new(
        geocoder: Arc<dyn GeocodeProvider>,
        weather: Arc<dyn WeatherProvider>,
        telemetry: Telemetry,
    ) -> Self {
        Self { geocoder, weather, telemetry }
    }

    /// Resolve `cep` to the current temperature of its city.
    ///
    /// The postal code is validated again here, whatever the caller did.
    pub async fn resolve(&self, cep: &str, parent: &Context) -> Result<WeatherResult, PipelineError> {
        let cep = Cep::parse(cep)?;
        let location = self.locate(&cep, parent).await?;
        let reading = self.temperature(&location, parent).await?;

        debug!(%cep, city = %location.city, celsius = reading.celsius, "resolved");
        Ok(WeatherResult::new(location.city, convert(reading.celsius)))
    }

    async fn locate(&self, cep: &Cep, parent: &Context) -> Result<Location, PipelineError> {
        let span = self.telemetry.start_span("geocode.lookup", SpanKind::Client, parent);
        span.set_attribute("cep", cep.to_string());

        match self.geocoder.locate(cep, span.context()).await {
            Ok(location) => {
                span.set_attribute("city", location.city.clone());
                span.set_attribute("uf", location.region.clone());
                Ok(location)
            }
            Err(err) => {
                span.record_error(&err);
                Err(err)
            }
        }
    }

    async fn temperature(
        &self,
        location: &Location,
        parent: &Context,
    ) -> Result<TemperatureReading, PipelineError> {
        let span = self.telemetry.start_span("weather.current", SpanKind::Client, parent);
        span.set_attribute("city", location.city.clone());
        span.set_attribute("uf", location.region.clone());

        self.weather
            .current_temperature(location, span.context())
            .await
            .inspect_err(|err| span.record_error(err))
    }
}
