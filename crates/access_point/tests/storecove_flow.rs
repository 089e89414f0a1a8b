use access_point::{ConnectionFactory, DeliveryTracker};
use config::GatewayConfig;
use peppol_gw_core::{DeliveryState, GatewayError, ParticipantId, SubmissionRequest};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> GatewayConfig {
    let mut cfg = GatewayConfig::default();
    cfg.storecove.base_url = Some(server.uri());
    cfg.storecove.api_key = Some("sc-key".into());
    cfg.lets_peppol.base_url = Some(server.uri());
    cfg.lets_peppol.api_key = Some("lp-key".into());
    cfg
}

#[tokio::test]
async fn storecove_submission_and_delivery_happy_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/document_submissions"))
        .and(header("Authorization", "Bearer sc-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "guid": "doc-guid-123",
            "status": "submitted"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/document_submissions/doc-guid-123/delivery_status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "delivered"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let factory = ConnectionFactory::new(config_for(&server));
    let connection = factory.storecove().unwrap();

    let request = SubmissionRequest::new("<Invoice/>", ParticipantId::new("0208", "0123456789"))
        .with_metadata(serde_json::json!({"legal_entity_id": 123}));
    let result = connection.submit_document(&request).await.unwrap();
    assert_eq!(result.reference_id, "doc-guid-123");
    assert!(result.accepted);

    let tracked = factory.create_by_name("storecove").unwrap();
    let mut tracker = DeliveryTracker::from_submission(tracked, &result).unwrap();
    assert_eq!(tracker.state(), DeliveryState::Pending);

    let status = tracker.refresh().await.unwrap();
    assert_eq!(status.state, DeliveryState::Delivered);
    assert_eq!(status.raw_status.as_deref(), Some("delivered"));
    assert!(tracker.is_terminal());
}

#[tokio::test]
async fn rate_limited_submission_surfaces_a_typed_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/document_submissions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(serde_json::json!({"message": "Too many requests"})),
        )
        .mount(&server)
        .await;

    let factory = ConnectionFactory::new(config_for(&server));
    let connection = factory.storecove().unwrap();
    let request = SubmissionRequest::new("<Invoice/>", ParticipantId::new("0208", "0123456789"));

    let err = connection.submit_document(&request).await.unwrap_err();
    assert_eq!(err.status_code(), Some(429));
    assert!(matches!(
        err,
        GatewayError::RateLimited { message, .. } if message.contains("Too many requests")
    ));
}

#[tokio::test]
async fn provider_secrets_never_cross_connections() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/participants/0208:0123456789"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let factory = ConnectionFactory::new(config_for(&server));
    let connection = factory.lets_peppol().unwrap();
    connection
        .participants()
        .get("0208:0123456789")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let headers = &requests[0].headers;
    assert_eq!(
        headers.get("x-api-key").and_then(|v| v.to_str().ok()),
        Some("lp-key")
    );
    // The StoreCove bearer token must not bleed into LetsPeppol calls.
    assert!(headers.get("authorization").is_none());
}
