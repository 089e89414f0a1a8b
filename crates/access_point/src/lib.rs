use std::sync::Arc;

use async_trait::async_trait;
use peppol_gw_core::{GatewayError, ProviderIdentity};
use transport::{Method, RequestBody, RequestOptions, Transport};

pub mod einvoicing_be;
pub mod factory;
pub mod lets_peppol;
pub mod mock;
pub mod peppyrus;
pub mod status;
pub mod storecove;
pub mod tracker;

pub use factory::ConnectionFactory;
pub use tracker::DeliveryTracker;

/// Uniform call surface over one access-point provider.
///
/// A connection owns its resolved base URL, its auth headers, and a
/// decorated transport stack. Connections are built fresh per logical
/// operation and never shared across unrelated submissions, so stale auth
/// state cannot leak between tenants.
#[async_trait]
pub trait ProviderConnection: Send + Sync {
    fn provider(&self) -> ProviderIdentity;

    /// Issue a provider API call. `path` is joined onto the connection's
    /// base URL; a 2xx JSON body comes back as a decoded map, everything
    /// else as a typed error from the translator in the stack.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, GatewayError>;

    /// Provider-native delivery-status call for a submitted document,
    /// used by the lifecycle tracker.
    async fn fetch_raw_status(
        &self,
        reference_id: &str,
    ) -> Result<serde_json::Value, GatewayError>;

    /// Provider-native cancellation. Providers without a cancel endpoint
    /// fail with a configuration error and leave the document untouched.
    async fn cancel_document(
        &self,
        reference_id: &str,
    ) -> Result<serde_json::Value, GatewayError>;
}

impl std::fmt::Debug for dyn ProviderConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConnection")
            .field("provider", &self.provider())
            .finish()
    }
}

/// Shared request plumbing for the concrete connections: join the path,
/// attach headers and body, decode the JSON response. An empty 2xx body
/// (e.g. a 204 on DELETE) decodes as an empty map.
pub(crate) async fn request_json(
    transport: &Arc<dyn Transport>,
    base_url: &str,
    headers: &[(String, String)],
    method: Method,
    path: &str,
    body: Option<serde_json::Value>,
) -> Result<serde_json::Value, GatewayError> {
    let url = format!("{}{}", base_url, path);
    let mut options = RequestOptions::new();
    options.headers = headers.to_vec();
    if let Some(body) = body {
        options.body = Some(RequestBody::Json(body));
    }

    let response = transport.execute(method, &url, options).await?;
    if response.body.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    response.json()
}

/// Pull the provider's reference id out of a submission response. The id
/// format is provider-specific (GUID, numeric, composite) and is always
/// surfaced as an opaque string.
pub(crate) fn extract_reference(
    raw: &serde_json::Value,
    field: &str,
) -> Result<String, GatewayError> {
    match raw.get(field) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        _ => Err(GatewayError::decode(format!(
            "submission response is missing the `{field}` reference field"
        ))),
    }
}

/// Seed a provider submission body from caller metadata. Object metadata
/// is merged at the top level (providers take fields like
/// `legal_entity_id` there); anything else lands under a `metadata` key.
pub(crate) fn body_with_metadata(
    metadata: &Option<serde_json::Value>,
) -> serde_json::Map<String, serde_json::Value> {
    match metadata {
        Some(serde_json::Value::Object(map)) => map.clone(),
        Some(other) => {
            let mut map = serde_json::Map::new();
            map.insert("metadata".to_string(), other.clone());
            map
        }
        None => serde_json::Map::new(),
    }
}

/// A synchronous rejection is the one case where a 2xx submission response
/// still means "not accepted".
pub(crate) fn submission_accepted(raw: &serde_json::Value) -> bool {
    match raw.get("status").and_then(|s| s.as_str()) {
        Some(status) => !matches!(status.to_lowercase().as_str(), "rejected" | "failed"),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_extraction_handles_string_and_numeric_ids() {
        let raw = serde_json::json!({"guid": "doc-guid-123"});
        assert_eq!(extract_reference(&raw, "guid").unwrap(), "doc-guid-123");

        let raw = serde_json::json!({"id": 4711});
        assert_eq!(extract_reference(&raw, "id").unwrap(), "4711");

        let raw = serde_json::json!({"status": "ok"});
        assert!(matches!(
            extract_reference(&raw, "guid"),
            Err(GatewayError::Decode { .. })
        ));
    }

    #[test]
    fn synchronous_rejection_is_not_accepted() {
        assert!(submission_accepted(
            &serde_json::json!({"status": "submitted"})
        ));
        assert!(submission_accepted(&serde_json::json!({"guid": "x"})));
        assert!(!submission_accepted(
            &serde_json::json!({"status": "rejected"})
        ));
        assert!(!submission_accepted(&serde_json::json!({"status": "FAILED"})));
    }
}
