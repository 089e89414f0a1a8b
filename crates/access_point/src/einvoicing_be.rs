use std::sync::Arc;

use async_trait::async_trait;
use peppol_gw_core::{GatewayError, ProviderIdentity, SubmissionRequest, SubmissionResult};
use transport::{Method, Transport};

use crate::{
    body_with_metadata, extract_reference, request_json, submission_accepted, ProviderConnection,
};

/// EInvoicing.be access-point connection. Dual static auth: a bearer token
/// plus an API key, both set on the header map once at construction.
pub struct EInvoicingBeConnection {
    base_url: String,
    headers: Vec<(String, String)>,
    transport: Arc<dyn Transport>,
}

impl EInvoicingBeConnection {
    pub fn new(
        base_url: String,
        token: String,
        api_key: String,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            base_url,
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {}", token)),
                ("X-API-Key".to_string(), api_key),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            transport,
        })
    }

    pub fn invoices(&self) -> Invoices<'_> {
        Invoices { connection: self }
    }

    pub fn participants(&self) -> Participants<'_> {
        Participants { connection: self }
    }

    pub fn vat(&self) -> Vat<'_> {
        Vat { connection: self }
    }

    /// Shape and submit a [`SubmissionRequest`]. EInvoicing.be answers
    /// with a `submissionId`.
    pub async fn submit_document(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResult, GatewayError> {
        let mut body = body_with_metadata(&request.metadata);
        body.insert(
            "document".to_string(),
            serde_json::Value::String(request.document.clone()),
        );
        body.insert(
            "participant".to_string(),
            serde_json::json!({
                "scheme": request.routing.scheme,
                "id": request.routing.id,
            }),
        );
        if !request.attachments.is_empty() {
            body.insert(
                "attachments".to_string(),
                serde_json::to_value(&request.attachments)
                    .map_err(|e| GatewayError::decode(e.to_string()))?,
            );
        }

        let raw = self
            .request(
                Method::POST,
                "/api/v1/invoices/submit",
                Some(serde_json::Value::Object(body)),
            )
            .await?;

        let reference_id = extract_reference(&raw, "submissionId")?;
        tracing::info!(reference_id = %reference_id, "document submitted to EInvoicing.be");

        Ok(SubmissionResult {
            reference_id,
            accepted: submission_accepted(&raw),
            raw,
        })
    }
}

#[async_trait]
impl ProviderConnection for EInvoicingBeConnection {
    fn provider(&self) -> ProviderIdentity {
        ProviderIdentity::EInvoicingBe
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, GatewayError> {
        request_json(
            &self.transport,
            &self.base_url,
            &self.headers,
            method,
            path,
            body,
        )
        .await
    }

    async fn fetch_raw_status(
        &self,
        reference_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        self.request(
            Method::GET,
            &format!("/api/v1/invoices/submissions/{}/status", reference_id),
            None,
        )
        .await
    }

    async fn cancel_document(
        &self,
        _reference_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        Err(GatewayError::configuration(
            "EInvoicing.be does not support cancellation",
        ))
    }
}

pub struct Invoices<'a> {
    connection: &'a EInvoicingBeConnection,
}

impl Invoices<'_> {
    pub async fn submit(
        &self,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::POST, "/api/v1/invoices/submit", Some(body))
            .await
    }

    pub async fn status(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(
                Method::GET,
                &format!("/api/v1/invoices/submissions/{}/status", id),
                None,
            )
            .await
    }
}

pub struct Participants<'a> {
    connection: &'a EInvoicingBeConnection,
}

impl Participants<'_> {
    pub async fn get(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::GET, &format!("/api/v1/participants/{}", id), None)
            .await
    }
}

pub struct Vat<'a> {
    connection: &'a EInvoicingBeConnection,
}

impl Vat<'_> {
    pub async fn validate(&self, vat_number: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(
                Method::POST,
                "/api/v1/vat/validate",
                Some(serde_json::json!({"vatNumber": vat_number})),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use peppol_gw_core::ParticipantId;
    use transport::default_stack;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn connection(server: &MockServer) -> Arc<EInvoicingBeConnection> {
        EInvoicingBeConnection::new(
            server.uri(),
            "eib-token".to_string(),
            "eib-key".to_string(),
            default_stack(Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn sends_both_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/vat/validate"))
            .and(header("Authorization", "Bearer eib-token"))
            .and(header("X-API-Key", "eib-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"valid": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let raw = connection(&server)
            .vat()
            .validate("BE0123456789")
            .await
            .unwrap();
        assert_eq!(raw["valid"], true);
    }

    #[tokio::test]
    async fn submit_document_extracts_submission_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/invoices/submit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "submissionId": "sub-2024-001",
                "status": "submitted"
            })))
            .mount(&server)
            .await;

        let request = SubmissionRequest::new("<Invoice/>", ParticipantId::new("0208", "0123456789"));
        let result = connection(&server).submit_document(&request).await.unwrap();

        assert_eq!(result.reference_id, "sub-2024-001");
        assert!(result.accepted);
    }

    #[tokio::test]
    async fn cancellation_is_not_supported() {
        let server = MockServer::start().await;
        let err = connection(&server)
            .cancel_document("sub-2024-001")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Configuration { message } if message.contains("EInvoicing.be")
        ));
    }
}
