use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use peppol_gw_core::GatewayError;

pub mod http;
pub mod logger;
pub mod translate;

pub use http::HttpTransport;
pub use logger::RequestLogger;
pub use reqwest::Method;
pub use translate::ExceptionTranslator;

/// Structured response returned by every transport layer.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, GatewayError> {
        serde_json::from_str(&self.body).map_err(|e| GatewayError::decode(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Raw(String),
    Form(Vec<(String, String)>),
}

/// Per-call options. A missing timeout falls back to the transport's
/// default.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP-verb-agnostic request executor.
///
/// One invocation means exactly one network call: no retries, no caching.
/// Retry policy belongs to callers, never to this layer, so stacked
/// decorators can never multiply the effective attempt count.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<TransportResponse, GatewayError>;
}

/// The decorator stack every provider connection talks to:
/// `ExceptionTranslator(RequestLogger(HttpTransport))`.
///
/// The logger sits closest to the wire so it observes raw outcomes
/// (including failures the translator subsequently types); the translator
/// is the outermost layer, so business code never sees raw transport
/// errors.
pub fn default_stack(default_timeout: Duration) -> Arc<dyn Transport> {
    let base = Arc::new(HttpTransport::new(default_timeout));
    let logged = Arc::new(RequestLogger::new(base));
    Arc::new(ExceptionTranslator::new(logged))
}
