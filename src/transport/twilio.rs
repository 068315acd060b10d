use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::{ChatTransport, DeliveryReceipt, TransportError};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: Option<String>,
    status: Option<String>,
}

/// Twilio WhatsApp transport adapter
pub struct TwilioTransport {
    http: Client,
    account_sid: String,
    auth_token: String,
    /// Sender address, already in `whatsapp:+…` form
    from_number: String,
}

impl TwilioTransport {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            http: Client::new(),
            account_sid,
            auth_token,
            from_number,
        }
    }

    /// Twilio wants `whatsapp:` plus an E.164 number.
    pub fn format_number(&self, phone: &str) -> Result<String, TransportError> {
        let cleaned: String = phone
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect();
        if cleaned.chars().filter(|c| c.is_ascii_digit()).count() == 0 {
            return Err(TransportError::InvalidPhoneNumber);
        }
        let with_plus = if cleaned.starts_with('+') {
            cleaned
        } else {
            format!("+{cleaned}")
        };
        Ok(format!("whatsapp:{with_plus}"))
    }

    fn messages_url(&self) -> String {
        format!("{TWILIO_API_BASE}/Accounts/{}/Messages.json", self.account_sid)
    }
}

#[async_trait]
impl ChatTransport for TwilioTransport {
    async fn send_message(
        &self,
        to: &str,
        body: &str,
    ) -> Result<DeliveryReceipt, TransportError> {
        let to = self.format_number(to)?;
        debug!(%to, "sending text message");

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("From", self.from_number.as_str()),
                ("To", to.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "Twilio request rejected");
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TwilioMessageResponse = response.json().await?;
        Ok(DeliveryReceipt {
            message_id: parsed.sid,
            status: parsed.status,
        })
    }

    async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        _language_code: &str,
    ) -> Result<DeliveryReceipt, TransportError> {
        // Twilio templates go through Content SIDs, which this deployment
        // does not provision. Fall back to a plain text send.
        warn!(template_name, "template messages unsupported on Twilio, sending plain text");
        self.send_message(to, &format!("Template: {template_name}"))
            .await
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), TransportError> {
        // No read-receipt endpoint in the Twilio WhatsApp API.
        debug!(message_id, "mark_read is a no-op on Twilio");
        Ok(())
    }
}
