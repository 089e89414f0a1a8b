use std::sync::Arc;

use async_trait::async_trait;
use peppol_gw_core::{GatewayError, ProviderIdentity, SubmissionRequest, SubmissionResult};
use transport::{Method, Transport};

use crate::{
    body_with_metadata, extract_reference, request_json, submission_accepted, ProviderConnection,
};

/// StoreCove access-point connection.
///
/// Auth is a static bearer token, set on the header map once at
/// construction. StoreCove is the broadest provider: besides document
/// submission it manages webhooks and legal entities.
pub struct StoreCoveConnection {
    base_url: String,
    headers: Vec<(String, String)>,
    transport: Arc<dyn Transport>,
}

impl StoreCoveConnection {
    pub fn new(base_url: String, api_key: String, transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self {
            base_url,
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {}", api_key)),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            transport,
        })
    }

    pub fn documents(&self) -> DocumentSubmissions<'_> {
        DocumentSubmissions { connection: self }
    }

    pub fn webhooks(&self) -> Webhooks<'_> {
        Webhooks { connection: self }
    }

    pub fn legal_entities(&self) -> LegalEntities<'_> {
        LegalEntities { connection: self }
    }

    /// Shape a [`SubmissionRequest`] into StoreCove's submission body and
    /// submit it. The returned reference id is StoreCove's `guid`.
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
            "routing".to_string(),
            serde_json::json!({
                "eIdentifiers": [{
                    "scheme": request.routing.scheme,
                    "id": request.routing.id,
                }]
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
                "/api/v2/document_submissions",
                Some(serde_json::Value::Object(body)),
            )
            .await?;

        let reference_id = extract_reference(&raw, "guid")?;
        tracing::info!(reference_id = %reference_id, "document submitted to StoreCove");

        Ok(SubmissionResult {
            reference_id,
            accepted: submission_accepted(&raw),
            raw,
        })
    }
}

#[async_trait]
impl ProviderConnection for StoreCoveConnection {
    fn provider(&self) -> ProviderIdentity {
        ProviderIdentity::StoreCove
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
            &format!("/api/v2/document_submissions/{}/delivery_status", reference_id),
            None,
        )
        .await
    }

    async fn cancel_document(
        &self,
        reference_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        self.request(
            Method::DELETE,
            &format!("/api/v2/document_submissions/{}", reference_id),
            None,
        )
        .await
    }
}

/// Document submission endpoint group: pure path/body shaping over the
/// connection, no interpretation of the decoded map.
pub struct DocumentSubmissions<'a> {
    connection: &'a StoreCoveConnection,
}

impl DocumentSubmissions<'_> {
    pub async fn submit(
        &self,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::POST, "/api/v2/document_submissions", Some(body))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(
                Method::GET,
                &format!("/api/v2/document_submissions/{}", id),
                None,
            )
            .await
    }

    pub async fn delivery_status(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(
                Method::GET,
                &format!("/api/v2/document_submissions/{}/delivery_status", id),
                None,
            )
            .await
    }

    pub async fn cancel(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(
                Method::DELETE,
                &format!("/api/v2/document_submissions/{}", id),
                None,
            )
            .await
    }
}

/// Webhook management (StoreCove only).
pub struct Webhooks<'a> {
    connection: &'a StoreCoveConnection,
}

impl Webhooks<'_> {
    pub async fn create(
        &self,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::POST, "/api/v2/webhooks", Some(body))
            .await
    }

    pub async fn list(&self) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::GET, "/api/v2/webhooks", None)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::DELETE, &format!("/api/v2/webhooks/{}", id), None)
            .await
    }
}

/// Legal-entity management (StoreCove only).
pub struct LegalEntities<'a> {
    connection: &'a StoreCoveConnection,
}

impl LegalEntities<'_> {
    pub async fn create(
        &self,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::POST, "/api/v2/legal_entities", Some(body))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::GET, &format!("/api/v2/legal_entities/{}", id), None)
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(
                Method::PUT,
                &format!("/api/v2/legal_entities/{}", id),
                Some(body),
            )
            .await
    }
}
