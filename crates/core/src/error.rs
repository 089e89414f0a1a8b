use thiserror::Error;

/// Typed error taxonomy for the gateway.
///
/// HTTP error responses are translated exactly once, at the transport
/// decorator boundary, into the band variants below. Everything above that
/// boundary (connections, endpoint groups, tracker) propagates these
/// unchanged.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection or timeout failure before any HTTP response was received.
    #[error("network error: {message}")]
    Network { message: String },

    /// HTTP 429. Callers should back off before resubmitting.
    #[error("rate limited by provider (HTTP {status}): {message}")]
    RateLimited { status: u16, message: String },

    /// HTTP 5xx. Transient; safe to retry with backoff.
    #[error("provider server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// HTTP 4xx other than 429. Malformed request or auth failure;
    /// not retryable.
    #[error("provider rejected request (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    /// Unknown provider identifier at factory time.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Required configuration or credential material is missing, or the
    /// requested operation is not available for the selected provider.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A response body that was required to be JSON could not be parsed.
    #[error("failed to decode provider response: {message}")]
    Decode { message: String },
}

impl GatewayError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// The original HTTP status code, where one was observed.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimited { status, .. }
            | Self::Server { status, .. }
            | Self::Client { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a caller-level backoff-and-retry is reasonable.
    ///
    /// 429 and 5xx are transient; 4xx (including 400) is not. Retry policy
    /// always belongs to the caller, never to the transport.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Server { .. })
    }
}
