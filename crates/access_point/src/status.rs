use peppol_gw_core::{DeliveryState, ProviderIdentity};

/// Map a provider's native status string onto the canonical delivery
/// state.
///
/// The mapping is total: every status string a provider is known to emit
/// maps to exactly one canonical state, and anything unmapped comes back
/// as `Unknown` with a warning log. A provider adding a status value must
/// never break a caller that is merely polling for progress.
pub fn map_provider_status(provider: ProviderIdentity, raw: &str) -> DeliveryState {
    let normalized = raw.trim().to_lowercase();
    let mapped = match provider {
        ProviderIdentity::StoreCove => match normalized.as_str() {
            "pending" | "submitted" => Some(DeliveryState::Pending),
            "sending" | "processing" => Some(DeliveryState::Processing),
            "delivered" => Some(DeliveryState::Delivered),
            "accepted" | "acknowledged" => Some(DeliveryState::Acknowledged),
            "rejected" => Some(DeliveryState::Rejected),
            "failed" | "error" => Some(DeliveryState::Failed),
            "cancelled" => Some(DeliveryState::Cancelled),
            _ => None,
        },
        ProviderIdentity::LetsPeppol => match normalized.as_str() {
            "queued" | "received" => Some(DeliveryState::Pending),
            "in_transit" | "sending" => Some(DeliveryState::Processing),
            "delivered" => Some(DeliveryState::Delivered),
            "acknowledged" => Some(DeliveryState::Acknowledged),
            "rejected" => Some(DeliveryState::Rejected),
            "failed" | "undeliverable" => Some(DeliveryState::Failed),
            "cancelled" => Some(DeliveryState::Cancelled),
            _ => None,
        },
        ProviderIdentity::Peppyrus => match normalized.as_str() {
            "created" | "new" => Some(DeliveryState::Pending),
            "transmitting" | "processing" => Some(DeliveryState::Processing),
            "delivered" => Some(DeliveryState::Delivered),
            "confirmed" => Some(DeliveryState::Acknowledged),
            "refused" => Some(DeliveryState::Rejected),
            "failed" | "error" => Some(DeliveryState::Failed),
            "cancelled" | "aborted" => Some(DeliveryState::Cancelled),
            _ => None,
        },
        ProviderIdentity::EInvoicingBe => match normalized.as_str() {
            "submitted" | "pending" => Some(DeliveryState::Pending),
            "processing" | "routing" => Some(DeliveryState::Processing),
            "delivered" => Some(DeliveryState::Delivered),
            "accepted" => Some(DeliveryState::Acknowledged),
            "rejected" => Some(DeliveryState::Rejected),
            "failed" => Some(DeliveryState::Failed),
            "cancelled" => Some(DeliveryState::Cancelled),
            _ => None,
        },
    };

    match mapped {
        Some(state) => state,
        None => {
            tracing::warn!(
                provider = %provider,
                raw_status = %raw,
                "unmapped provider status, treating as unknown"
            );
            DeliveryState::Unknown
        }
    }
}
