use serde::{Deserialize, Serialize};

/// Query parameters of the webhook verification handshake
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Top-level inbound webhook payload (Meta Cloud API shape)
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: WebhookValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: Option<WebhookText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookText {
    pub body: String,
}

/// A decoded inbound text message, as handed to the bot orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender: String,
    pub text: String,
    pub message_id: String,
}

impl WebhookPayload {
    /// Flatten the nested payload into text messages, dropping every other
    /// message type.
    pub fn text_messages(&self) -> Vec<InboundMessage> {
        self.entry
            .iter()
            .flat_map(|e| &e.changes)
            .flat_map(|c| &c.value.messages)
            .filter(|m| m.message_type == "text")
            .filter_map(|m| {
                let body = m.text.as_ref()?.body.trim().to_string();
                if body.is_empty() {
                    return None;
                }
                Some(InboundMessage {
                    sender: m.from.clone(),
                    text: body,
                    message_id: m.id.clone(),
                })
            })
            .collect()
    }
}
