use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Phone-to-user index used by the chat channel to resolve inbound senders.
///
/// One active mapping per number; created once OTP verification succeeds.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WhatsAppMapping {
    pub id: Uuid,
    pub user_id: Uuid,
    pub whatsapp_number: String,
    pub is_active: bool,
    pub last_interaction: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
