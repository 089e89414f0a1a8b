use std::time::Duration;

use async_trait::async_trait;
use peppol_gw_core::GatewayError;

use crate::{Method, RequestBody, RequestOptions, Transport, TransportResponse};

/// Stateless reqwest-backed transport. Holds no provider knowledge; base
/// URLs and auth headers arrive fully resolved in the call options.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(default_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(default_timeout)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<TransportResponse, GatewayError> {
        let mut request = self.client.request(method, url);

        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        match options.body {
            Some(RequestBody::Json(value)) => request = request.json(&value),
            Some(RequestBody::Raw(text)) => request = request.body(text),
            Some(RequestBody::Form(fields)) => request = request.form(&fields),
            None => {}
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
