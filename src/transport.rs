pub mod meta;
pub mod twilio;

use async_trait::async_trait;

pub use meta::MetaCloudTransport;
pub use twilio::TwilioTransport;

/// Transport errors for outbound provider calls
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid phone number")]
    InvalidPhoneNumber,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Provider acknowledgement for a delivered message
#[derive(Debug, Clone, Default)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
    pub status: Option<String>,
}

/// Capability for delivering messages over the chat channel.
///
/// The bot core depends only on this trait; provider specifics (endpoints,
/// auth, phone-number normalization) live in the adapters.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver a free-form text message to a phone number
    async fn send_message(&self, to: &str, body: &str)
        -> Result<DeliveryReceipt, TransportError>;

    /// Deliver a pre-approved template message
    async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        language_code: &str,
    ) -> Result<DeliveryReceipt, TransportError>;

    /// Mark an inbound message as read. Best-effort; callers log failures
    /// and move on.
    async fn mark_read(&self, message_id: &str) -> Result<(), TransportError>;
}
