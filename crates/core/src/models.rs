use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// The four supported Peppol access-point providers.
///
/// Defined once and referenced everywhere else by value; everything
/// provider-specific (base URLs, auth scheme, status vocabulary) keys off
/// this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderIdentity {
    StoreCove,
    LetsPeppol,
    Peppyrus,
    EInvoicingBe,
}

impl ProviderIdentity {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::StoreCove => "StoreCove",
            Self::LetsPeppol => "LetsPeppol",
            Self::Peppyrus => "Peppyrus",
            Self::EInvoicingBe => "EInvoicing.be",
        }
    }

    /// Default API base URL for the given environment. Configuration may
    /// override this per provider.
    pub fn default_base_url(&self, environment: Environment) -> &'static str {
        match (self, environment) {
            (Self::StoreCove, Environment::Production) => "https://api.storecove.com",
            (Self::StoreCove, Environment::Sandbox) => "https://api.sandbox.storecove.com",
            (Self::LetsPeppol, Environment::Production) => "https://api.letspeppol.com",
            (Self::LetsPeppol, Environment::Sandbox) => "https://sandbox.letspeppol.com",
            (Self::Peppyrus, Environment::Production) => "https://api.peppyrus.be",
            (Self::Peppyrus, Environment::Sandbox) => "https://sandbox.peppyrus.be",
            (Self::EInvoicingBe, Environment::Production) => "https://api.einvoicing.be",
            (Self::EInvoicingBe, Environment::Sandbox) => "https://sandbox.einvoicing.be",
        }
    }

    pub fn all() -> [ProviderIdentity; 4] {
        [
            Self::StoreCove,
            Self::LetsPeppol,
            Self::Peppyrus,
            Self::EInvoicingBe,
        ]
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderIdentity {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "storecove" => Ok(Self::StoreCove),
            "letspeppol" | "lets_peppol" => Ok(Self::LetsPeppol),
            "peppyrus" => Ok(Self::Peppyrus),
            "einvoicingbe" | "einvoicing_be" => Ok(Self::EInvoicingBe),
            other => Err(GatewayError::UnsupportedProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

/// Peppol participant routing identifier, e.g. scheme `0208` (Belgian
/// enterprise number) with the enterprise number as id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantId {
    pub scheme: String,
    pub id: String,
}

impl ParticipantId {
    pub fn new(scheme: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            id: id.into(),
        }
    }

    /// `scheme:id` form used in provider query strings and path segments.
    pub fn qualified(&self) -> String {
        format!("{}:{}", self.scheme, self.id)
    }
}

/// A finished business document handed over by the invoicing domain.
///
/// The document payload is opaque to the gateway; structural validation is
/// the provider's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub document: String,
    pub routing: ParticipantId,
    pub metadata: Option<serde_json::Value>,
    pub attachments: Vec<Attachment>,
}

impl SubmissionRequest {
    pub fn new(document: impl Into<String>, routing: ParticipantId) -> Self {
        Self {
            document: document.into(),
            routing,
            metadata: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub content_base64: String,
}

impl Attachment {
    pub fn from_bytes(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        content: &[u8],
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            content_base64: base64::engine::general_purpose::STANDARD.encode(content),
        }
    }
}

/// Outcome of a submission call.
///
/// `reference_id` is the provider's handle for all later status queries.
/// Its format is provider-specific (GUID, numeric, composite string) and
/// must be treated as opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub reference_id: String,
    pub accepted: bool,
    pub raw: serde_json::Value,
}

/// Canonical delivery lifecycle states.
///
/// Every provider's native status vocabulary maps onto this set; strings
/// with no mapping become `Unknown` rather than an error, so provider-side
/// vocabulary additions never break polling callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Processing,
    Delivered,
    Acknowledged,
    Rejected,
    Failed,
    Cancelled,
    Unknown,
}

impl DeliveryState {
    /// Terminal states stop lifecycle tracking. `Unknown` is deliberately
    /// non-terminal: tracking continues until a mapped terminal state is
    /// observed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Acknowledged | Self::Rejected | Self::Failed | Self::Cancelled
        )
    }

    /// Whether the lifecycle machine permits moving from `self` to `next`.
    ///
    /// Forward jumps are allowed (a poll may miss intermediate states, e.g.
    /// `Pending` straight to `Delivered`). `Delivered` may still advance to
    /// `Acknowledged`; no other transition leaves a terminal state.
    /// Self-transitions are allowed so a repeated refresh is idempotent.
    pub fn can_transition_to(&self, next: DeliveryState) -> bool {
        if *self == next {
            return true;
        }
        match (self, next) {
            // A mapped state never regresses to Unknown.
            (_, Self::Unknown) => false,
            (Self::Unknown, _) => true,
            (Self::Pending, Self::Processing) => true,
            (Self::Pending | Self::Processing, next) => {
                matches!(
                    next,
                    Self::Delivered
                        | Self::Acknowledged
                        | Self::Rejected
                        | Self::Failed
                        | Self::Cancelled
                )
            }
            (Self::Delivered, Self::Acknowledged) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Delivered => "delivered",
            Self::Acknowledged => "acknowledged",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Snapshot returned by a status refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub reference_id: String,
    pub state: DeliveryState,
    pub raw_status: Option<String>,
    pub message: Option<String>,
}
