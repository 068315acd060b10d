use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use super::{ChatTransport, DeliveryReceipt, TransportError};

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v18.0";

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

/// Meta (WhatsApp Cloud API) transport adapter
pub struct MetaCloudTransport {
    http: Client,
    access_token: String,
    phone_number_id: String,
    /// Country code assumed when a sender supplies a bare 10-digit number
    default_country_code: String,
}

impl MetaCloudTransport {
    pub fn new(access_token: String, phone_number_id: String, default_country_code: String) -> Self {
        Self {
            http: Client::new(),
            access_token,
            phone_number_id,
            default_country_code,
        }
    }

    /// Cloud API wants bare digits with a country code and no plus sign.
    /// A 10-digit number is assumed to be missing the country code.
    pub fn format_number(&self, phone: &str) -> Result<String, TransportError> {
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(TransportError::InvalidPhoneNumber);
        }
        if digits.len() == 10 {
            Ok(format!("{}{}", self.default_country_code, digits))
        } else {
            Ok(digits)
        }
    }

    fn messages_url(&self) -> String {
        format!("{GRAPH_API_BASE}/{}/messages", self.phone_number_id)
    }

    async fn post(&self, payload: serde_json::Value) -> Result<reqwest::Response, TransportError> {
        let response = self
            .http
            .post(self.messages_url())
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "Cloud API request rejected");
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatTransport for MetaCloudTransport {
    async fn send_message(
        &self,
        to: &str,
        body: &str,
    ) -> Result<DeliveryReceipt, TransportError> {
        let to = self.format_number(to)?;
        debug!(%to, "sending text message");

        let response = self
            .post(json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": body }
            }))
            .await?;

        let parsed: SendResponse = response.json().await?;
        Ok(DeliveryReceipt {
            message_id: parsed.messages.into_iter().next().map(|m| m.id),
            status: Some("sent".to_string()),
        })
    }

    async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        language_code: &str,
    ) -> Result<DeliveryReceipt, TransportError> {
        let to = self.format_number(to)?;
        debug!(%to, template_name, "sending template message");

        let response = self
            .post(json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "template",
                "template": {
                    "name": template_name,
                    "language": { "code": language_code }
                }
            }))
            .await?;

        let parsed: SendResponse = response.json().await?;
        Ok(DeliveryReceipt {
            message_id: parsed.messages.into_iter().next().map(|m| m.id),
            status: Some("sent".to_string()),
        })
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), TransportError> {
        self.post(json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": message_id
        }))
        .await?;
        Ok(())
    }
}
