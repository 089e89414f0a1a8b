use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use peppol_gw_core::GatewayError;
use uuid::Uuid;

use crate::{Method, RequestOptions, Transport, TransportResponse};

/// Ephemeral per-call log record. Never persisted; exists only to shape
/// the structured log fields.
#[derive(Debug)]
pub struct RequestLogEntry {
    pub correlation_id: String,
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub status: Option<u16>,
    pub duration_ms: u64,
}

/// Replace secret-bearing header values before they reach a log line.
pub fn redact_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let lower = name.to_lowercase();
            if lower == "authorization"
                || lower == "x-api-key"
                || lower.contains("secret")
                || lower.contains("token")
            {
                (name.clone(), "[redacted]".to_string())
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect()
}

/// Decorator logging each request and its outcome under one correlation
/// id. Sits innermost in the stack so it observes the raw response status
/// or the raw failure, before any translation. Returns the inner outcome
/// unchanged.
pub struct RequestLogger {
    inner: Arc<dyn Transport>,
}

impl RequestLogger {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Transport for RequestLogger {
    async fn execute(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<TransportResponse, GatewayError> {
        let mut entry = RequestLogEntry {
            correlation_id: Uuid::new_v4().to_string(),
            method: method.to_string(),
            url: url.to_string(),
            headers: redact_headers(&options.headers),
            status: None,
            duration_ms: 0,
        };
        tracing::debug!(
            correlation_id = %entry.correlation_id,
            method = %entry.method,
            url = %entry.url,
            headers = ?entry.headers,
            "outbound provider request"
        );

        let started = Instant::now();
        let result = self.inner.execute(method, url, options).await;
        entry.duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => {
                entry.status = Some(response.status);
                tracing::info!(
                    correlation_id = %entry.correlation_id,
                    status = response.status,
                    duration_ms = entry.duration_ms,
                    "provider request completed"
                );
            }
            Err(error) => {
                tracing::warn!(
                    correlation_id = %entry.correlation_id,
                    error = %error,
                    duration_ms = entry.duration_ms,
                    "provider request failed"
                );
            }
        }

        result
    }
}
