use std::sync::Arc;

use peppol_gw_core::{DeliveryState, DeliveryStatus, GatewayError, SubmissionResult};

use crate::status::map_provider_status;
use crate::ProviderConnection;

/// Lifecycle position of one submitted document.
#[derive(Debug, Clone)]
pub struct TrackedDocument {
    pub reference_id: String,
    pub state: DeliveryState,
}

/// Caller-driven delivery lifecycle tracker for one submitted document.
///
/// There is no background polling here: the invoicing domain (or a
/// scheduled job) calls [`refresh`] on demand. Each refresh fetches the
/// provider-native status, maps it through the provider's vocabulary
/// table, and advances the tracked state when the machine allows it.
/// Status tracking degrades gracefully: an unmapped provider status is
/// surfaced as `Unknown` data, never as an error.
///
/// [`refresh`]: DeliveryTracker::refresh
pub struct DeliveryTracker {
    connection: Arc<dyn ProviderConnection>,
    document: TrackedDocument,
}

impl DeliveryTracker {
    /// Track an accepted submission, starting at `Pending`. Returns `None`
    /// when the provider rejected the submission synchronously — there is
    /// no delivery lifecycle to track then.
    pub fn from_submission(
        connection: Arc<dyn ProviderConnection>,
        result: &SubmissionResult,
    ) -> Option<Self> {
        if !result.accepted {
            return None;
        }
        Some(Self::new(connection, result.reference_id.clone()))
    }

    pub fn new(connection: Arc<dyn ProviderConnection>, reference_id: String) -> Self {
        Self {
            connection,
            document: TrackedDocument {
                reference_id,
                state: DeliveryState::Pending,
            },
        }
    }

    pub fn reference_id(&self) -> &str {
        &self.document.reference_id
    }

    /// The last canonical state the machine accepted. Never `Unknown`.
    pub fn state(&self) -> DeliveryState {
        self.document.state
    }

    pub fn is_terminal(&self) -> bool {
        self.document.state.is_terminal()
    }

    /// Poll the provider once and reconcile.
    ///
    /// The returned snapshot reports what the provider said (including
    /// `Unknown` for unmapped vocabulary); the tracked state only moves
    /// along legal transitions. An illegal reported transition (a stale or
    /// out-of-order provider read) is logged and the previous state kept.
    pub async fn refresh(&mut self) -> Result<DeliveryStatus, GatewayError> {
        let raw = self
            .connection
            .fetch_raw_status(&self.document.reference_id)
            .await?;

        let raw_status = extract_status_string(&raw);
        let observed = match raw_status.as_deref() {
            Some(status) => map_provider_status(self.connection.provider(), status),
            None => {
                tracing::warn!(
                    provider = %self.connection.provider(),
                    reference_id = %self.document.reference_id,
                    "status response carries no recognizable status field"
                );
                DeliveryState::Unknown
            }
        };

        if observed != DeliveryState::Unknown {
            if self.document.state.can_transition_to(observed) {
                if self.document.state != observed {
                    tracing::info!(
                        reference_id = %self.document.reference_id,
                        from = %self.document.state,
                        to = %observed,
                        "delivery state advanced"
                    );
                }
                self.document.state = observed;
            } else {
                tracing::warn!(
                    reference_id = %self.document.reference_id,
                    current = %self.document.state,
                    reported = %observed,
                    "ignoring illegal delivery state transition"
                );
            }
        }

        Ok(DeliveryStatus {
            reference_id: self.document.reference_id.clone(),
            state: observed,
            raw_status,
            message: extract_message(&raw),
        })
    }

    /// Explicitly cancel a document that has not reached a terminal state.
    pub async fn cancel(&mut self) -> Result<(), GatewayError> {
        if self.document.state.is_terminal() {
            return Err(GatewayError::configuration(format!(
                "cannot cancel document {} in terminal state {}",
                self.document.reference_id, self.document.state
            )));
        }

        self.connection
            .cancel_document(&self.document.reference_id)
            .await?;
        self.document.state = DeliveryState::Cancelled;
        tracing::info!(
            reference_id = %self.document.reference_id,
            "document cancelled"
        );
        Ok(())
    }
}

/// Providers disagree on the field carrying the status string.
fn extract_status_string(raw: &serde_json::Value) -> Option<String> {
    for field in ["status", "state", "delivery_status"] {
        if let Some(status) = raw.get(field).and_then(|s| s.as_str()) {
            if !status.is_empty() {
                return Some(status.to_string());
            }
        }
    }
    None
}

fn extract_message(raw: &serde_json::Value) -> Option<String> {
    for field in ["message", "reason", "error"] {
        if let Some(message) = raw.get(field).and_then(|m| m.as_str()) {
            if !message.is_empty() {
                return Some(message.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use peppol_gw_core::ProviderIdentity;

    use crate::mock::MockConnection;

    use super::*;

    fn accepted_submission() -> SubmissionResult {
        SubmissionResult {
            reference_id: "doc-guid-123".to_string(),
            accepted: true,
            raw: serde_json::json!({"guid": "doc-guid-123", "status": "submitted"}),
        }
    }

    #[tokio::test]
    async fn happy_path_walks_to_acknowledged() {
        let connection = MockConnection::with_statuses(
            ProviderIdentity::StoreCove,
            vec![
                serde_json::json!({"status": "submitted"}),
                serde_json::json!({"status": "processing"}),
                serde_json::json!({"status": "delivered"}),
                serde_json::json!({"status": "accepted"}),
            ],
        );
        let mut tracker =
            DeliveryTracker::from_submission(connection, &accepted_submission()).unwrap();
        assert_eq!(tracker.state(), DeliveryState::Pending);

        assert_eq!(tracker.refresh().await.unwrap().state, DeliveryState::Pending);
        assert_eq!(
            tracker.refresh().await.unwrap().state,
            DeliveryState::Processing
        );
        assert_eq!(
            tracker.refresh().await.unwrap().state,
            DeliveryState::Delivered
        );
        assert!(tracker.is_terminal());

        // Delivered may still advance to Acknowledged.
        assert_eq!(
            tracker.refresh().await.unwrap().state,
            DeliveryState::Acknowledged
        );
        assert_eq!(tracker.state(), DeliveryState::Acknowledged);
    }

    #[tokio::test]
    async fn rejected_submission_has_no_tracker() {
        let connection = MockConnection::new(ProviderIdentity::StoreCove);
        let result = SubmissionResult {
            reference_id: "doc-guid-999".to_string(),
            accepted: false,
            raw: serde_json::json!({"status": "rejected"}),
        };
        assert!(DeliveryTracker::from_submission(connection, &result).is_none());
    }

    #[tokio::test]
    async fn unknown_status_is_surfaced_but_never_stored() {
        let connection = MockConnection::with_statuses(
            ProviderIdentity::StoreCove,
            vec![
                serde_json::json!({"status": "processing"}),
                serde_json::json!({"status": "quantum_entangled"}),
            ],
        );
        let mut tracker = DeliveryTracker::new(connection, "doc-guid-123".to_string());

        tracker.refresh().await.unwrap();
        let snapshot = tracker.refresh().await.unwrap();

        assert_eq!(snapshot.state, DeliveryState::Unknown);
        assert_eq!(snapshot.raw_status.as_deref(), Some("quantum_entangled"));
        // The tracked state keeps its last canonical value.
        assert_eq!(tracker.state(), DeliveryState::Processing);
    }

    #[tokio::test]
    async fn stale_provider_reads_do_not_move_the_state_backwards() {
        let connection = MockConnection::with_statuses(
            ProviderIdentity::StoreCove,
            vec![
                serde_json::json!({"status": "delivered"}),
                serde_json::json!({"status": "pending"}),
            ],
        );
        let mut tracker = DeliveryTracker::new(connection, "doc-guid-123".to_string());

        tracker.refresh().await.unwrap();
        let snapshot = tracker.refresh().await.unwrap();

        assert_eq!(snapshot.state, DeliveryState::Pending);
        assert_eq!(tracker.state(), DeliveryState::Delivered);
    }

    #[tokio::test]
    async fn failure_carries_the_provider_message() {
        let connection = MockConnection::with_statuses(
            ProviderIdentity::LetsPeppol,
            vec![serde_json::json!({
                "status": "undeliverable",
                "reason": "recipient not registered"
            })],
        );
        let mut tracker = DeliveryTracker::new(connection, "90210".to_string());

        let snapshot = tracker.refresh().await.unwrap();
        assert_eq!(snapshot.state, DeliveryState::Failed);
        assert_eq!(
            snapshot.message.as_deref(),
            Some("recipient not registered")
        );
        assert!(tracker.is_terminal());
    }

    #[tokio::test]
    async fn cancel_moves_non_terminal_documents_to_cancelled() {
        let connection = MockConnection::new(ProviderIdentity::StoreCove);
        let mut tracker = DeliveryTracker::new(connection, "doc-guid-123".to_string());

        tracker.cancel().await.unwrap();
        assert_eq!(tracker.state(), DeliveryState::Cancelled);
    }

    #[tokio::test]
    async fn cancel_is_rejected_in_terminal_states() {
        let connection = MockConnection::with_statuses(
            ProviderIdentity::StoreCove,
            vec![serde_json::json!({"status": "rejected"})],
        );
        let mut tracker = DeliveryTracker::new(connection, "doc-guid-123".to_string());
        tracker.refresh().await.unwrap();

        let err = tracker.cancel().await.unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
        assert_eq!(tracker.state(), DeliveryState::Rejected);
    }
}
