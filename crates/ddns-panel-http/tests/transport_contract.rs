//! Contract Test: Reqwest Transport Against a Mock Remote
//!
//! Constraints verified:
//! - Paths are joined onto the API base, bodies are sent as JSON
//! - Non-2xx replies are returned, not turned into errors
//! - No reply at all is a transport error
//! - No-cache requests carry no-cache headers
//! - The gateway's typed helpers work end to end over this transport

use ddns_panel_core::traits::{HttpRequest, HttpTransport};
use ddns_panel_core::{Error, GatewayConfig, IpType, RequestGateway};
use ddns_panel_http::ReqwestTransport;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport_for(server: &MockServer) -> ReqwestTransport {
    ReqwestTransport::new(format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn get_reaches_joined_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "configs": []})))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport_for(&server)
        .send(&HttpRequest::get("/configs"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.body.contains("\"success\":true"));
}

#[tokio::test]
async fn post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/wizard/validate-token"))
        .and(body_json(json!({"token": "t1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "zones": []})))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport_for(&server)
        .send(&HttpRequest::post("/wizard/validate-token", Some(json!({"token": "t1"}))))
        .await
        .unwrap();

    assert!(response.is_success());
}

#[tokio::test]
async fn non_2xx_is_a_reply_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let response = transport_for(&server)
        .send(&HttpRequest::get("/status"))
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert_eq!(response.body, "maintenance");
}

#[tokio::test]
async fn no_cache_requests_carry_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .and(header("pragma", "no-cache"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut request = HttpRequest::get("/health");
    request.no_cache = true;
    let response = transport_for(&server).send(&request).await.unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn unreachable_remote_is_a_transport_error() {
    // Nothing listens on port 1
    let transport = ReqwestTransport::new("http://127.0.0.1:1/api", Duration::from_secs(2)).unwrap();

    let err = transport.send(&HttpRequest::get("/health")).await.unwrap_err();

    assert!(err.message().contains("127.0.0.1:1"));
}

#[tokio::test]
async fn slow_reply_times_out_as_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let transport =
        ReqwestTransport::new(format!("{}/api", server.uri()), Duration::from_millis(200)).unwrap();

    assert!(transport.send(&HttpRequest::get("/health")).await.is_err());
}

#[tokio::test]
async fn gateway_helpers_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ip/v4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "ip": "203.0.113.9"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/configs"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = RequestGateway::new(Arc::new(transport_for(&server)), &GatewayConfig::default()).unwrap();

    assert!(gateway.probe_health().await);
    assert_eq!(gateway.current_ip(IpType::Ipv4).await.unwrap(), "203.0.113.9");

    // A 400 is not retried: the mock expects exactly one call
    let err = gateway.save_configs(&[]).await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 400, .. }));
}
