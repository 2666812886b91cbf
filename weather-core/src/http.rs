//! HTTP surface of the gateway and the resolver.

use axum::{
    Json,
    body::Bytes,
    extract::rejection::BytesRejection,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::SpanKind;

use crate::{
    error::PipelineError,
    model::{CepRequest, ErrorBody},
    telemetry::{SpanGuard, Telemetry, TraceCarrier},
};

pub mod gateway;
pub mod resolver;

/// The only route either process serves.
pub const CEP_ROUTE: &str = "/cep";

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let body = ErrorBody { message: self.public_message().to_string() };
        (self.status_code(), Json(body)).into_response()
    }
}

/// A body that cannot be read (too large, broken stream) is reported like a
/// malformed postal code.
pub(crate) fn read_body(body: Result<Bytes, BytesRejection>) -> Result<Bytes, PipelineError> {
    body.map_err(|e| PipelineError::invalid_input(format!("unreadable request body: {e}")))
}

/// Malformed JSON is reported exactly like a malformed postal code.
pub(crate) fn decode_request(body: &[u8]) -> Result<CepRequest, PipelineError> {
    serde_json::from_slice(body)
        .map_err(|e| PipelineError::invalid_input(format!("malformed request body: {e}")))
}

/// Server span for an inbound request, parented on the caller's trace context.
pub(crate) fn server_span(
    telemetry: &Telemetry,
    name: &'static str,
    headers: &HeaderMap,
) -> SpanGuard {
    let parent = telemetry.extract(&TraceCarrier::from_headers(headers));
    let span = telemetry.start_span(name, SpanKind::Server, &parent);
    span.set_attribute("http.request.method", "POST");
    span.set_attribute("http.route", CEP_ROUTE);
    span
}

pub(crate) fn record_status(span: &SpanGuard, response: &Response) {
    span.set_attribute("http.response.status_code", i64::from(response.status().as_u16()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};

    #[test]
    fn decode_rejects_garbage_as_invalid_input() {
        for body in [&b"not json"[..], &b"{}"[..], &b"{\"cep\":1001000}"[..], &b""[..]] {
            let err = decode_request(body).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidInput { .. }));
        }
    }

    #[test]
    fn read_body_passes_bytes_through() {
        let body = read_body(Ok(Bytes::from_static(b"{}"))).unwrap();
        assert_eq!(&body[..], b"{}");
    }

    #[tokio::test]
    async fn error_renders_message_body() {
        let response = PipelineError::not_found("detail stays private").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], br#"{"message":"can not find zipcode"}"#);
    }
}
