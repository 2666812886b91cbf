//! Distributed tracing for both hops.
//!
//! A [`Telemetry`] is built once per process and handed to every component
//! that starts spans. Trace context crosses process boundaries through an
//! explicit [`TraceCarrier`] rather than thread-local state.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::{
    Context, KeyValue, Value,
    propagation::{Extractor, Injector, TextMapCompositePropagator, TextMapPropagator},
    trace::{SpanKind, Status, TraceContextExt, TraceId, Tracer as _, TracerProvider as _},
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracer, SdkTracerProvider},
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::PipelineError;

pub const DEFAULT_OTLP_ENDPOINT: &str = "http://otel-collector:4317";
pub const DEFAULT_LOG_FILTER: &str = "weather_core=info,weather_server=info,tower_http=info";

/// Upper bound for the final flush at process exit.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Export spans over OTLP. When false spans are still created and
    /// propagated, just never shipped.
    pub enabled: bool,
    /// OTLP gRPC collector, e.g. `http://localhost:4317`.
    pub endpoint: String,
    pub service_name: String,
    /// Used when `RUST_LOG` is not set.
    pub log_filter: String,
    pub export_timeout: Duration,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: service_name.into(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            export_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to initialize logging: {0}")]
    Init(String),
}

/// Install the global `tracing` subscriber used for logs.
pub fn init_logging(default_filter: &str) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))
}

/// Process-wide tracing pipeline: tracer, exporter and propagator.
#[derive(Clone)]
pub struct Telemetry {
    inner: Arc<Inner>,
}

struct Inner {
    provider: SdkTracerProvider,
    tracer: SdkTracer,
    propagator: TextMapCompositePropagator,
    service_name: String,
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("service_name", &self.inner.service_name)
            .finish_non_exhaustive()
    }
}

impl Telemetry {
    /// Wrap an already-built provider. Tests use this with an in-memory exporter.
    pub fn new(provider: SdkTracerProvider, service_name: impl Into<String>) -> Self {
        let service_name = service_name.into();
        let tracer = provider.tracer(service_name.clone());
        let propagator = TextMapCompositePropagator::new(vec![
            Box::new(TraceContextPropagator::new()),
            Box::new(BaggagePropagator::new()),
        ]);

        Self {
            inner: Arc::new(Inner { provider, tracer, propagator, service_name }),
        }
    }

    /// Spans are recorded and propagated but not exported anywhere.
    pub fn disabled(service_name: impl Into<String>) -> Self {
        let service_name = service_name.into();
        let provider =
            SdkTracerProvider::builder().with_resource(resource(&service_name)).build();
        Self::new(provider, service_name)
    }

    /// Build the OTLP/gRPC batch pipeline described by `config`.
    ///
    /// If the exporter cannot be created the process keeps running with
    /// export disabled.
    pub fn init(config: &TelemetryConfig) -> Self {
        if !config.enabled {
            info!(service = %config.service_name, "span export disabled");
            return Self::disabled(config.service_name.clone());
        }

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(config.endpoint.clone())
            .with_timeout(config.export_timeout)
            .build();

        match exporter {
            Ok(exporter) => {
                let provider = SdkTracerProvider::builder()
                    .with_batch_exporter(exporter)
                    .with_resource(resource(&config.service_name))
                    .build();

                info!(
                    endpoint = %config.endpoint,
                    service = %config.service_name,
                    "span export enabled"
                );
                Self::new(provider, config.service_name.clone())
            }
            Err(e) => {
                warn!(
                    endpoint = %config.endpoint,
                    error = %e,
                    "OTLP exporter unavailable, spans will not be exported"
                );
                Self::disabled(config.service_name.clone())
            }
        }
    }

    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    /// Start a span as a child of `parent` (or a new root if `parent` has none).
    pub fn start_span(&self, name: &'static str, kind: SpanKind, parent: &Context) -> SpanGuard {
        let span = self
            .inner
            .tracer
            .span_builder(name)
            .with_kind(kind)
            .start_with_context(&self.inner.tracer, parent);

        SpanGuard { cx: parent.with_span(span) }
    }

    /// Serialize the trace context of `cx` for an outbound request.
    pub fn inject(&self, cx: &Context) -> TraceCarrier {
        let mut carrier = TraceCarrier::default();
        self.inner.propagator.inject_context(cx, &mut carrier);
        carrier
    }

    /// Rebuild a remote parent context from an inbound carrier.
    pub fn extract(&self, carrier: &TraceCarrier) -> Context {
        self.inner.propagator.extract_with_context(&Context::new(), carrier)
    }

    /// Flush pending spans and stop the exporter, giving up after `timeout`.
    pub async fn shutdown(self, timeout: Duration) {
        let provider = self.inner.provider.clone();
        let flush = tokio::task::spawn_blocking(move || provider.shutdown());

        match tokio::time::timeout(timeout, flush).await {
            Ok(Ok(Ok(()))) => info!("telemetry flushed"),
            Ok(Ok(Err(e))) => warn!(error = %e, "telemetry shutdown failed"),
            Ok(Err(e)) => warn!(error = %e, "telemetry shutdown task panicked"),
            Err(_) => warn!(?timeout, "telemetry flush timed out"),
        }
    }
}

fn resource(service_name: &str) -> Resource {
    Resource::builder().with_service_name(service_name.to_owned()).build()
}

/// A started span, ended when dropped.
#[derive(Debug)]
pub struct SpanGuard {
    cx: Context,
}

impl SpanGuard {
    /// Context to pass to children and to [`Telemetry::inject`].
    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn trace_id(&self) -> TraceId {
        self.cx.span().span_context().trace_id()
    }

    pub fn set_attribute(&self, key: &'static str, value: impl Into<Value>) {
        self.cx.span().set_attribute(KeyValue::new(key, value));
    }

    pub fn record_error(&self, err: &PipelineError) {
        let span = self.cx.span();
        span.record_error(err);
        span.set_status(Status::error(err.to_string()));
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.cx.span().end();
    }
}

/// String map carrying trace context across a network hop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceCarrier(HashMap<String, String>);

impl TraceCarrier {
    /// Copy every header with a textual value. Keys are lowercased.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let entries = headers
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        Self(entries)
    }

    /// Render as request headers, skipping entries that are not valid HTTP.
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(self.0.len());
        for (key, value) in &self.0 {
            if let (Ok(name), Ok(value)) =
                (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(value))
            {
                headers.insert(name, value);
            }
        }
        headers
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Injector for TraceCarrier {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_ascii_lowercase(), value);
    }
}

impl Extractor for TraceCarrier {
    fn get(&self, key: &str) -> Option<&str> {
        TraceCarrier::get(self, key)
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}
