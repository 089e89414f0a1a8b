use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use peppol_gw_core::{GatewayError, ProviderIdentity};
use tokio::sync::Mutex;
use transport::Method;

use crate::ProviderConnection;

/// Scripted in-memory connection for tests and demos. `request` answers
/// with a fixed acknowledgement; `fetch_raw_status` replays the queued
/// status payloads in order, repeating the last one once the script is
/// exhausted.
pub struct MockConnection {
    provider: ProviderIdentity,
    statuses: Mutex<VecDeque<serde_json::Value>>,
    last: Mutex<serde_json::Value>,
}

impl MockConnection {
    pub fn new(provider: ProviderIdentity) -> Arc<Self> {
        Self::with_statuses(provider, Vec::new())
    }

    pub fn with_statuses(
        provider: ProviderIdentity,
        statuses: Vec<serde_json::Value>,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            statuses: Mutex::new(statuses.into()),
            last: Mutex::new(serde_json::json!({"status": "pending"})),
        })
    }
}

#[async_trait]
impl ProviderConnection for MockConnection {
    fn provider(&self) -> ProviderIdentity {
        self.provider
    }

    async fn request(
        &self,
        _method: Method,
        path: &str,
        _body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, GatewayError> {
        Ok(serde_json::json!({"ok": true, "path": path}))
    }

    async fn fetch_raw_status(
        &self,
        _reference_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        let mut queue = self.statuses.lock().await;
        match queue.pop_front() {
            Some(status) => {
                *self.last.lock().await = status.clone();
                Ok(status)
            }
            None => Ok(self.last.lock().await.clone()),
        }
    }

    async fn cancel_document(
        &self,
        _reference_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        Ok(serde_json::json!({}))
    }
}
