use std::time::Duration;

use peppol_gw_core::GatewayError;
use transport::{default_stack, Method, RequestOptions, Transport as _};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn stacked_decorators_surface_typed_rate_limit_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/transmissions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(serde_json::json!({"message": "Too many requests"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let stack = default_stack(Duration::from_secs(5));
    let url = format!("{}/api/transmissions", server.uri());
    let err = stack
        .execute(Method::POST, &url, RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(429));
    assert!(err.is_retryable());
    assert!(matches!(
        err,
        GatewayError::RateLimited { message, .. } if message.contains("Too many requests")
    ));
}

#[tokio::test]
async fn stacked_decorators_pass_success_responses_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/invoices/42/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "42",
            "status": "delivered"
        })))
        .mount(&server)
        .await;

    let stack = default_stack(Duration::from_secs(5));
    let url = format!("{}/v1/invoices/42/status", server.uri());
    let response = stack
        .execute(Method::GET, &url, RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["status"], "delivered");
}

#[tokio::test]
async fn stacked_decorators_report_network_failures_once() {
    let stack = default_stack(Duration::from_secs(1));
    let err = stack
        .execute(
            Method::GET,
            "http://127.0.0.1:1/unreachable",
            RequestOptions::new(),
        )
        .await
        .unwrap_err();

    // Network failures arrive as-is; the translator never re-wraps them.
    assert!(matches!(err, GatewayError::Network { .. }));
    assert_eq!(err.status_code(), None);
}
