//! Core library for postal code weather lookups.
//!
//! This crate defines:
//! - Postal code validation and unit conversion
//! - Geocode and weather providers behind traits
//! - The resolution pipeline and its error taxonomy
//! - Trace context propagation across network hops
//! - HTTP handlers for the gateway and the resolver
//!
//! It is used by `weather-server`, which runs both processes.

pub mod cep;
pub mod config;
pub mod convert;
pub mod error;
pub mod http;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod telemetry;

pub use cep::{Cep, is_valid_cep};
pub use config::{GatewayConfig, ResolverConfig};
pub use convert::{Temperatures, convert};
pub use error::{PipelineError, Upstream};
pub use model::{CepRequest, ErrorBody, Location, TemperatureReading, WeatherResult};
pub use pipeline::Pipeline;
pub use provider::{GeocodeProvider, WeatherProvider};
pub use telemetry::{SpanGuard, Telemetry, TelemetryConfig, TraceCarrier};
