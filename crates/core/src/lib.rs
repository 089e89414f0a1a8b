pub mod error;
pub mod models;

pub use error::GatewayError;
pub use models::{
    Attachment, DeliveryState, DeliveryStatus, Environment, ParticipantId, ProviderIdentity,
    SubmissionRequest, SubmissionResult,
};
