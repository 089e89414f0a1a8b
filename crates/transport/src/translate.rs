use std::sync::Arc;

use async_trait::async_trait;
use peppol_gw_core::GatewayError;

use crate::{Method, RequestOptions, Transport, TransportResponse};

const GENERIC_ERROR_MESSAGE: &str = "provider returned an error response";

/// Decorator mapping non-2xx HTTP outcomes to the typed error taxonomy.
///
/// Responses below 400 pass through untouched. Everything from the inner
/// transport's `Err` side is already a typed gateway error and passes
/// through unchanged, so translation happens exactly once in any stack.
pub struct ExceptionTranslator {
    inner: Arc<dyn Transport>,
}

impl ExceptionTranslator {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self { inner }
    }
}

/// Pull the provider's error message out of a JSON error body. Providers
/// disagree on the field name; `message` wins over `error`.
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(text) = value.get(field).and_then(|m| m.as_str()) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    GENERIC_ERROR_MESSAGE.to_string()
}

fn translate_status(response: &TransportResponse) -> GatewayError {
    let message = extract_message(&response.body);
    match response.status {
        429 => GatewayError::RateLimited {
            status: 429,
            message,
        },
        status if status >= 500 => GatewayError::Server { status, message },
        status => GatewayError::Client { status, message },
    }
}

#[async_trait]
impl Transport for ExceptionTranslator {
    async fn execute(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<TransportResponse, GatewayError> {
        let response = self.inner.execute(method, url, options).await?;
        if response.status < 400 {
            return Ok(response);
        }
        Err(translate_status(&response))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Inner transport returning a canned response, so each band can be
    /// exercised without a live server.
    struct CannedTransport {
        status: u16,
        body: String,
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn execute(
            &self,
            _method: Method,
            _url: &str,
            _options: RequestOptions,
        ) -> Result<TransportResponse, GatewayError> {
            Ok(TransportResponse {
                status: self.status,
                headers: HashMap::new(),
                body: self.body.clone(),
            })
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn execute(
            &self,
            _method: Method,
            _url: &str,
            _options: RequestOptions,
        ) -> Result<TransportResponse, GatewayError> {
            Err(GatewayError::network("connection reset"))
        }
    }

    async fn translate(status: u16, body: &str) -> Result<TransportResponse, GatewayError> {
        let translator = ExceptionTranslator::new(Arc::new(CannedTransport {
            status,
            body: body.to_string(),
        }));
        translator
            .execute(Method::GET, "https://example.test", RequestOptions::new())
            .await
    }

    #[tokio::test]
    async fn success_responses_pass_through_untouched() {
        let response = translate(200, r#"{"ok":true}"#).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn status_429_becomes_rate_limited_with_provider_message() {
        let err = translate(429, r#"{"message":"Too many requests"}"#)
            .await
            .unwrap_err();
        match err {
            GatewayError::RateLimited { status, message } => {
                assert_eq!(status, 429);
                assert!(message.contains("Too many requests"));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn five_hundreds_become_server_errors() {
        for status in [500, 502, 503] {
            let err = translate(status, r#"{"error":"upstream down"}"#)
                .await
                .unwrap_err();
            match err {
                GatewayError::Server { status: code, message } => {
                    assert_eq!(code, status);
                    assert_eq!(message, "upstream down");
                }
                other => panic!("expected Server, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn other_four_hundreds_become_client_errors() {
        for status in [400, 401, 404, 422] {
            let err = translate(status, r#"{"message":"invalid document"}"#)
                .await
                .unwrap_err();
            match err {
                GatewayError::Client { status: code, message } => {
                    assert_eq!(code, status);
                    assert_eq!(message, "invalid document");
                }
                other => panic!("expected Client, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn non_json_body_falls_back_to_generic_message() {
        let err = translate(404, "<html>not found</html>").await.unwrap_err();
        match err {
            GatewayError::Client { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, GENERIC_ERROR_MESSAGE);
            }
            other => panic!("expected Client, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn inner_errors_are_not_double_wrapped() {
        let translator = ExceptionTranslator::new(Arc::new(FailingTransport));
        let err = translator
            .execute(Method::GET, "https://example.test", RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Network { message } if message == "connection reset"));
    }
}
