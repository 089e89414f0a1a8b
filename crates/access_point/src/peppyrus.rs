use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use peppol_gw_core::{GatewayError, ProviderIdentity, SubmissionRequest, SubmissionResult};
use tokio::sync::Mutex;
use transport::{Method, RequestOptions, Transport};

use crate::{
    body_with_metadata, extract_reference, request_json, submission_accepted, ProviderConnection,
};

/// Safety margin subtracted from the provider-reported token lifetime, so
/// a token is never used right at its expiry edge.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct OAuthToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl OAuthToken {
    fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// Peppyrus access-point connection.
///
/// The only provider with dynamic credentials: OAuth2 client-credentials,
/// with the `Authorization` header recomputed lazily on every call. The
/// token cache is owned by this connection alone and the mutex is held
/// across the whole read-check-refresh sequence, so two concurrent callers
/// on a shared connection never issue duplicate refresh requests.
pub struct PeppyrusConnection {
    base_url: String,
    client_id: String,
    client_secret: String,
    transport: Arc<dyn Transport>,
    token: Mutex<Option<OAuthToken>>,
}

impl PeppyrusConnection {
    pub fn new(
        base_url: String,
        client_id: String,
        client_secret: String,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            base_url,
            client_id,
            client_secret,
            transport,
            token: Mutex::new(None),
        })
    }

    pub fn transmissions(&self) -> Transmissions<'_> {
        Transmissions { connection: self }
    }

    pub fn access_points(&self) -> AccessPoints<'_> {
        AccessPoints { connection: self }
    }

    /// Return the cached token while it is still inside its validity
    /// window, otherwise fetch a fresh one before the guarded request
    /// proceeds.
    async fn access_token(&self) -> Result<String, GatewayError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.is_valid() {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(access_token)
    }

    /// `POST /oauth/token` with client-credentials grant. Goes through the
    /// same decorated stack as business calls; token-endpoint failures map
    /// through the generic 4xx/5xx taxonomy.
    async fn fetch_token(&self) -> Result<OAuthToken, GatewayError> {
        let url = format!("{}/oauth/token", self.base_url);
        let options = RequestOptions::new()
            .header("Accept", "application/json")
            .form(vec![
                ("grant_type".to_string(), "client_credentials".to_string()),
                ("client_id".to_string(), self.client_id.clone()),
                ("client_secret".to_string(), self.client_secret.clone()),
            ]);

        let response = self.transport.execute(Method::POST, &url, options).await?;
        let value = response.json()?;

        let access_token = value
            .get("access_token")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::decode("token response is missing `access_token`"))?
            .to_string();
        let expires_in = value
            .get("expires_in")
            .and_then(|e| e.as_i64())
            .unwrap_or(3600);

        tracing::debug!(expires_in, "fetched fresh Peppyrus access token");

        Ok(OAuthToken {
            access_token,
            expires_at: Utc::now() + Duration::seconds(expires_in - TOKEN_EXPIRY_MARGIN_SECS),
        })
    }

    #[cfg(test)]
    async fn force_token_expiry(&self) {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_mut() {
            token.expires_at = Utc::now() - Duration::seconds(1);
        }
    }

    /// Shape and submit a [`SubmissionRequest`]. Peppyrus answers with a
    /// `transmissionId`.
    pub async fn submit_document(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResult, GatewayError> {
        let mut body = body_with_metadata(&request.metadata);
        body.insert(
            "content".to_string(),
            serde_json::Value::String(request.document.clone()),
        );
        body.insert(
            "receiver".to_string(),
            serde_json::json!({
                "scheme": request.routing.scheme,
                "identifier": request.routing.id,
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
                "/api/transmissions",
                Some(serde_json::Value::Object(body)),
            )
            .await?;

        let reference_id = extract_reference(&raw, "transmissionId")?;
        tracing::info!(reference_id = %reference_id, "document submitted to Peppyrus");

        Ok(SubmissionResult {
            reference_id,
            accepted: submission_accepted(&raw),
            raw,
        })
    }
}

#[async_trait]
impl ProviderConnection for PeppyrusConnection {
    fn provider(&self) -> ProviderIdentity {
        ProviderIdentity::Peppyrus
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, GatewayError> {
        let token = self.access_token().await?;
        let headers = vec![
            ("Authorization".to_string(), format!("Bearer {}", token)),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        request_json(&self.transport, &self.base_url, &headers, method, path, body).await
    }

    async fn fetch_raw_status(
        &self,
        reference_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        self.request(
            Method::GET,
            &format!("/api/transmissions/{}/status", reference_id),
            None,
        )
        .await
    }

    async fn cancel_document(
        &self,
        _reference_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        Err(GatewayError::configuration(
            "Peppyrus does not support cancellation",
        ))
    }
}

pub struct Transmissions<'a> {
    connection: &'a PeppyrusConnection,
}

impl Transmissions<'_> {
    pub async fn submit(
        &self,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::POST, "/api/transmissions", Some(body))
            .await
    }

    pub async fn status(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::GET, &format!("/api/transmissions/{}/status", id), None)
            .await
    }

    pub async fn retry(&self, id: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(Method::POST, &format!("/api/transmissions/{}/retry", id), None)
            .await
    }
}

pub struct AccessPoints<'a> {
    connection: &'a PeppyrusConnection,
}

impl AccessPoints<'_> {
    /// Look up the access point serving a participant. The identifier was
    /// already validated as an opaque string by the caller.
    pub async fn query(&self, participant: &str) -> Result<serde_json::Value, GatewayError> {
        self.connection
            .request(
                Method::GET,
                &format!("/api/access-points/query?participant={}", participant),
                None,
            )
            .await
    }
}
