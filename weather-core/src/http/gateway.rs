use axum::{
    Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use opentelemetry::{Context, trace::SpanKind};
use reqwest::Client;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::{
    cep::Cep,
    error::{PipelineError, Upstream},
    model::CepRequest,
    telemetry::Telemetry,
};

use super::{CEP_ROUTE, decode_request, read_body, record_status, server_span};

#[derive(Debug, Clone)]
pub struct GatewayState {
    http: Client,
    resolver_url: String,
    telemetry: Telemetry,
}

impl GatewayState {
    /// `resolver_url` is the resolver's base address, e.g. `http://resolver:8081`.
    pub fn new(http: Client, resolver_url: impl Into<String>, telemetry: Telemetry) -> Self {
        let resolver_url = resolver_url.into().trim_end_matches('/').to_string();
        Self { http, resolver_url, telemetry }
    }
}

/// Public endpoint: validate, then relay to the resolver. Only `POST /cep` is routed.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route(CEP_ROUTE, post(handle_cep))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// What the resolver answered, relayed as-is.
struct Relayed {
    status: StatusCode,
    content_type: HeaderValue,
    body: Bytes,
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        (self.status, [(CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

async fn handle_cep(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let span = server_span(&state.telemetry, "gateway.cep", &headers);

    let outcome = match validate(body) {
        Ok(request) => forward(&state, &request, span.context()).await,
        Err(err) => Err(err),
    };

    let response = match outcome {
        Ok(relayed) => relayed.into_response(),
        Err(err) => {
            warn!(error = %err, "request not forwarded");
            span.record_error(&err);
            err.into_response()
        }
    };

    record_status(&span, &response);
    response
}

fn validate(body: Result<Bytes, BytesRejection>) -> Result<CepRequest, PipelineError> {
    let body = read_body(body)?;
    let request = decode_request(&body)?;
    Cep::parse(&request.cep)?;
    Ok(request)
}

async fn forward(
    state: &GatewayState,
    request: &CepRequest,
    parent: &Context,
) -> Result<Relayed, PipelineError> {
    let span = state.telemetry.start_span("gateway.forward", SpanKind::Client, parent);
    let url = format!("{}{CEP_ROUTE}", state.resolver_url);
    span.set_attribute("url.full", url.clone());

    let result = send(state, &url, request, span.context()).await;
    match &result {
        Ok(relayed) => {
            debug!(status = %relayed.status, "resolver answered");
            span.set_attribute("http.response.status_code", i64::from(relayed.status.as_u16()));
        }
        Err(err) => span.record_error(err),
    }
    result
}

async fn send(
    state: &GatewayState,
    url: &str,
    request: &CepRequest,
    cx: &Context,
) -> Result<Relayed, PipelineError> {
    let res = state
        .http
        .post(url)
        .headers(state.telemetry.inject(cx).to_headers())
        .json(request)
        .send()
        .await
        .map_err(|e| PipelineError::unavailable(Upstream::Resolver, e))?;

    let status = res.status();
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    let body = res.bytes().await.map_err(|e| PipelineError::unavailable(Upstream::Resolver, e))?;

    Ok(Relayed { status, content_type, body })
}
