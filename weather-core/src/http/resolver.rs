use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{pipeline::Pipeline, telemetry::Telemetry};

use super::{CEP_ROUTE, decode_request, read_body, record_status, server_span};

#[derive(Debug, Clone)]
pub struct ResolverState {
    pipeline: Pipeline,
    telemetry: Telemetry,
}

impl ResolverState {
    pub fn new(pipeline: Pipeline, telemetry: Telemetry) -> Self {
        Self { pipeline, telemetry }
    }
}

/// Internal endpoint running the resolution pipeline. Only `POST /cep` is routed.
pub fn router(state: ResolverState) -> Router {
    Router::new()
        .route(CEP_ROUTE, post(handle_cep))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_cep(
    State(state): State<ResolverState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let span = server_span(&state.telemetry, "resolver.cep", &headers);

    let outcome = match read_body(body).and_then(|body| decode_request(&body)) {
        Ok(request) => state.pipeline.resolve(&request.cep, span.context()).await,
        Err(err) => Err(err),
    };

    let response = match outcome {
        Ok(result) => {
            info!(city = %result.city, temp_c = result.temp_celsius, "weather resolved");
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(err) => {
            warn!(error = %err, "resolution failed");
            span.record_error(&err);
            err.into_response()
        }
    };

    record_status(&span, &response);
    response
}
