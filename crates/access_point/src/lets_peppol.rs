use std::sync::Arc;

use async_trait::async_trait;
use peppol_gw_core::{GatewayError, ProviderIdentity, SubmissionRequest, SubmissionResult};
use transport::{Method, Transport};

use crate::{
    body_with_metadata, extract_reference, request_json, submission_accepted, ProviderConnection,
};

/// LetsPeppol access-point connection. Auth is a static API key in the
/// `X-API-Key` header, set once at construction.
pub struct LetsPeppolConnection {
    base_url: String,
    headers: Vec<(String, String)>,
    transport: Arc<dyn Transport>,
}

impl LetsPeppolConnection {
    pub fn new(base_url: String, api_key: String, transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self {
            base_url,
            headers: vec![
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

    pub fn validation(&self) -> Validation<'_> {
        Validation { connection: self }
    }

    /// Shape and submit a [`SubmissionRequest`]. LetsPeppol answers with a
    /// numeric `id`, surfaced as an opaque string.
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
            "recipient".to_string(),
            serde_json::Value::String(request.routing.qualified()),
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
                "/v1/invoices",
                Some(serde_json::Value::Object(body)),
            )
            .await?;

        let reference_id = extract_reference(&raw, "id")?;
        tracing::info!(reference_id = %reference_id, "document submitted to LetsPeppol");

        Ok(SubmissionResult {
            reference_id,
            accepted: submission_accepted(&raw),
            raw,
        })
    }
}

#[async_trait]
impl ProviderConnection for LetsPeppolConnection {
    fn provider(&self) -> ProviderIdentity {
        ProviderIdentity::LetsPeppol
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
            &format!("/v1/invoices/{}/status", reference_id),
            None,
        )
        .await
    }

    async fn cancel_document(
        &self,
        reference_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        self.request(
            Method::POST,
            &format!("/v1/invoices/{}/cancel", reference_id),
            None,
        )
        .await
    }
}

pub struct Invoices<'a> {
    connection: &'a LetsPeppolConnection,
}

impl Invoices<'_> {
    pub async fn submit(
        &self,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::POST, "/v1/invoices", Some(body))
            .await
    }

    pub async fn status(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::GET, &format!("/v1/invoices/{}/status", id), None)
            .await
    }

    pub async fn cancel(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::POST, &format!("/v1/invoices/{}/cancel", id), None)
            .await
    }
}

pub struct Participants<'a> {
    connection: &'a LetsPeppolConnection,
}

impl Participants<'_> {
    /// `id` is the qualified participant identifier (`scheme:id`), treated
    /// as an opaque path segment.
    pub async fn get(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::GET, &format!("/v1/participants/{}", id), None)
            .await
    }
}

pub struct Validation<'a> {
    connection: &'a LetsPeppolConnection,
}

impl Validation<'_> {
    /// Pipe a raw document to the provider's validation endpoint. The
    /// gateway does not interpret the validation verdict.
    pub async fn invoice(&self, document: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(
                Method::POST,
                "/v1/validation/invoice",
                Some(serde_json::json!({"document": document})),
            )
            .await
    }
}
