//! Outbound provider behaviour against mocked ViaCEP and WeatherAPI servers.

use std::time::Duration;

use opentelemetry::{Context, trace::SpanKind};
use reqwest::Client;
use serde_json::json;
use weather_core::{
    Cep, GeocodeProvider, Location, PipelineError, Telemetry, Upstream, WeatherProvider,
    provider::{ViaCepProvider, WeatherApiProvider, http_client},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn telemetry() -> Telemetry {
    Telemetry::disabled("provider-tests")
}

fn viacep(server: &MockServer) -> ViaCepProvider {
    ViaCepProvider::new(http_client().unwrap(), telemetry()).with_base_url(server.uri())
}

fn weatherapi(server: &MockServer, key: Option<&str>) -> WeatherApiProvider {
    WeatherApiProvider::new(key.map(str::to_string), http_client().unwrap(), telemetry())
        .with_base_url(server.uri())
}

fn cep(s: &str) -> Cep {
    Cep::parse(s).unwrap()
}

fn sao_paulo() -> Location {
    Location { city: "São Paulo".into(), region: "SP".into() }
}

// =============================================================================
// ViaCEP
// =============================================================================

#[tokio::test]
async fn viacep_resolves_city_and_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ws/01001000/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cep": "01001-000",
            "logradouro": "Praça da Sé",
            "localidade": "São Paulo",
            "uf": "SP"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let location = viacep(&server).locate(&cep("01001000"), &Context::new()).await.unwrap();
    assert_eq!(location, sao_paulo());
}

#[tokio::test]
async fn viacep_erro_flag_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ws/00000000/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "erro": "true" })))
        .mount(&server)
        .await;

    let err = viacep(&server).locate(&cep("00000000"), &Context::new()).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound { .. }));
}

#[tokio::test]
async fn viacep_400_and_404_are_not_found() {
    for status in [400, 404] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let err = viacep(&server).locate(&cep("12345678"), &Context::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }), "status {status}: {err}");
    }
}

#[tokio::test]
async fn viacep_other_status_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = viacep(&server).locate(&cep("12345678"), &Context::new()).await.unwrap_err();
    assert_eq!(
        err,
        PipelineError::UpstreamProtocolError {
            upstream: Upstream::Geocode,
            status: Some(503),
            detail: Some("maintenance".into()),
        }
    );
}

#[tokio::test]
async fn viacep_garbage_body_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = viacep(&server).locate(&cep("12345678"), &Context::new()).await.unwrap_err();
    assert!(matches!(err, PipelineError::UpstreamProtocolError { upstream: Upstream::Geocode, .. }));
}

#[tokio::test]
async fn viacep_timeout_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "localidade": "São Paulo", "uf": "SP" }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let http = Client::builder().timeout(Duration::from_millis(50)).build().unwrap();
    let provider = ViaCepProvider::new(http, telemetry()).with_base_url(server.uri());

    let err = provider.locate(&cep("01001000"), &Context::new()).await.unwrap_err();
    assert!(matches!(err, PipelineError::UpstreamUnavailable { upstream: Upstream::Geocode, .. }));
}

#[tokio::test]
async fn viacep_connection_refused_is_unavailable() {
    let provider =
        ViaCepProvider::new(http_client().unwrap(), telemetry()).with_base_url("http://127.0.0.1:9");

    let err = provider.locate(&cep("01001000"), &Context::new()).await.unwrap_err();
    assert!(matches!(err, PipelineError::UpstreamUnavailable { upstream: Upstream::Geocode, .. }));
}

#[tokio::test]
async fn viacep_request_carries_traceparent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "localidade": "São Paulo", "uf": "SP" })),
        )
        .mount(&server)
        .await;

    let telemetry = telemetry();
    let span = telemetry.start_span("geocode.lookup", SpanKind::Client, &Context::new());
    let provider = ViaCepProvider::new(http_client().unwrap(), telemetry.clone())
        .with_base_url(server.uri());

    provider.locate(&cep("01001000"), span.context()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let traceparent = requests[0].headers.get("traceparent").unwrap().to_str().unwrap();
    assert!(traceparent.contains(&span.trace_id().to_string()));
}

// =============================================================================
// WeatherAPI
// =============================================================================

#[tokio::test]
async fn weatherapi_reads_celsius_with_country_and_aqi_off() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .and(query_param("key", "test-key"))
        .and(query_param("q", "São Paulo,SP,BR"))
        .and(query_param("aqi", "no"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "location": { "name": "Sao Paulo", "country": "Brazil" },
            "current": { "temp_c": 25.0, "temp_f": 77.0 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reading = weatherapi(&server, Some("test-key"))
        .current_temperature(&sao_paulo(), &Context::new())
        .await
        .unwrap();

    assert_eq!(reading.celsius, 25.0);
}

#[tokio::test]
async fn weatherapi_without_key_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let err = weatherapi(&server, None)
        .current_temperature(&sao_paulo(), &Context::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::MissingCredential { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn weatherapi_error_status_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"error":{"code":2006,"message":"API key is invalid."}}"#),
        )
        .mount(&server)
        .await;

    let err = weatherapi(&server, Some("bad"))
        .current_temperature(&sao_paulo(), &Context::new())
        .await
        .unwrap_err();

    match err {
        PipelineError::UpstreamProtocolError { upstream, status, detail } => {
            assert_eq!(upstream, Upstream::Weather);
            assert_eq!(status, Some(401));
            assert!(detail.unwrap().contains("API key is invalid"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn weatherapi_malformed_payload_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "current": {} })))
        .mount(&server)
        .await;

    let err = weatherapi(&server, Some("k"))
        .current_temperature(&sao_paulo(), &Context::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::UpstreamProtocolError { upstream: Upstream::Weather, .. }));
}

#[tokio::test]
async fn weatherapi_transport_error_does_not_leak_key() {
    let provider = WeatherApiProvider::new(Some("top-secret".into()), http_client().unwrap(), telemetry())
        .with_base_url("http://127.0.0.1:9");

    let err = provider.current_temperature(&sao_paulo(), &Context::new()).await.unwrap_err();

    assert!(matches!(err, PipelineError::UpstreamUnavailable { upstream: Upstream::Weather, .. }));
    assert!(!err.to_string().contains("top-secret"));
}
