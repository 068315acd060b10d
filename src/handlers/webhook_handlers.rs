use axum::{
    body::Bytes,
    extract::{Extension, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::bot::BotOrchestrator;
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::webhook::{VerifyParams, WebhookPayload};
use crate::repositories::user_repository::UserRepository;
use crate::transport::ChatTransport;

type HmacSha256 = Hmac<Sha256>;

/// Webhook-facing configuration slice
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Token echoed back during the verification handshake
    pub verify_token: String,
    /// App secret for X-Hub-Signature-256 validation
    pub app_secret: String,
    /// Signature validation toggle; on by default
    pub verify_signatures: bool,
}

/// Spend-reminder delivery configuration
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Approved template name. Unset means plain-text delivery (sandbox
    /// numbers cannot receive templates).
    pub template: Option<String>,
}

const REMINDER_TEXT: &str =
    "Please reply with your expense details via WhatsApp. Example: 120 petrol lunch";

/// Check an `X-Hub-Signature-256: sha256=<hex>` header against the raw body.
pub fn signature_is_valid(app_secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(header) = header else {
        return false;
    };
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Handler for the GET verification handshake.
///
/// Echoes the challenge back verbatim when the mode is `subscribe` and the
/// token matches; rejects everything else.
pub async fn verify_webhook_handler(
    State(config): State<Arc<WebhookConfig>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let mode_ok = params.mode.as_deref() == Some("subscribe");
    let token_ok = params.verify_token.as_deref() == Some(config.verify_token.as_str());

    if mode_ok && token_ok {
        info!("webhook verified");
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        warn!("webhook verification failed");
        (StatusCode::FORBIDDEN, "Verification failed").into_response()
    }
}

/// Handler for inbound webhook events.
///
/// Signature failures are rejected outright. Malformed bodies are logged and
/// acknowledged with an error status body (200, so the transport does not
/// treat the failure as retryable). Only text messages are processed;
/// everything else is silently ignored.
pub async fn receive_webhook_handler(
    State(config): State<Arc<WebhookConfig>>,
    State(orchestrator): State<Arc<BotOrchestrator>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if config.verify_signatures {
        let header = headers
            .get("X-Hub-Signature-256")
            .and_then(|h| h.to_str().ok());
        if !signature_is_valid(&config.app_secret, &body, header) {
            warn!("webhook signature verification failed");
            return (StatusCode::FORBIDDEN, "Signature verification failed").into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "undecodable webhook body");
            return Json(json!({ "status": "error" })).into_response();
        }
    };

    for message in payload.text_messages() {
        orchestrator.handle_message(&message).await;
    }

    Json(json!({ "status": "success" })).into_response()
}

/// Handler for nudging the authenticated user to log expenses over WhatsApp
pub async fn send_reminder_handler(
    State(users): State<Arc<dyn UserRepository>>,
    State(transport): State<Arc<dyn ChatTransport>>,
    State(reminder): State<Arc<ReminderConfig>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Response {
    let user = match users.find_by_id(auth_user.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "user_not_found" })),
            )
                .into_response();
        }
        Err(e) => {
            error!(error = %e, "user lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "database_error" })),
            )
                .into_response();
        }
    };

    let Some(number) = user.whatsapp_number else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "no_whatsapp_number" })),
        )
            .into_response();
    };

    let result = match reminder.template.as_deref() {
        Some(template) => transport.send_template(&number, template, "en_US").await,
        None => transport.send_message(&number, REMINDER_TEXT).await,
    };

    match result {
        Ok(_) => Json(json!({ "status": "sent" })).into_response(),
        Err(e) => {
            error!(error = %e, "reminder delivery failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "delivery_failed" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_signature_roundtrip() {
        let body = br#"{"object":"whatsapp_business_account"}"#;
        let header = sign("secret", body);
        assert!(signature_is_valid("secret", body, Some(&header)));
    }

    #[test]
    fn test_signature_wrong_secret() {
        let body = b"payload";
        let header = sign("secret", body);
        assert!(!signature_is_valid("other_secret", body, Some(&header)));
    }

    #[test]
    fn test_signature_tampered_body() {
        let header = sign("secret", b"payload");
        assert!(!signature_is_valid("secret", b"tampered", Some(&header)));
    }

    #[test]
    fn test_signature_missing_header() {
        assert!(!signature_is_valid("secret", b"payload", None));
    }

    #[test]
    fn test_signature_malformed_header() {
        assert!(!signature_is_valid("secret", b"payload", Some("md5=abc")));
        assert!(!signature_is_valid("secret", b"payload", Some("sha256=nothex")));
        assert!(!signature_is_valid("secret", b"payload", Some("")));
    }

    #[tokio::test]
    async fn test_verify_handshake_accepts_matching_token() {
        let config = Arc::new(WebhookConfig {
            verify_token: "verify_me".to_string(),
            app_secret: "secret".to_string(),
            verify_signatures: true,
        });

        let response = verify_webhook_handler(
            State(config),
            Query(VerifyParams {
                mode: Some("subscribe".to_string()),
                verify_token: Some("verify_me".to_string()),
                challenge: Some("challenge_1234".to_string()),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"challenge_1234");
    }

    #[tokio::test]
    async fn test_verify_handshake_rejects_bad_token() {
        let config = Arc::new(WebhookConfig {
            verify_token: "verify_me".to_string(),
            app_secret: "secret".to_string(),
            verify_signatures: true,
        });

        let response = verify_webhook_handler(
            State(config),
            Query(VerifyParams {
                mode: Some("subscribe".to_string()),
                verify_token: Some("wrong".to_string()),
                challenge: Some("challenge_1234".to_string()),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_verify_handshake_rejects_bad_mode() {
        let config = Arc::new(WebhookConfig {
            verify_token: "verify_me".to_string(),
            app_secret: "secret".to_string(),
            verify_signatures: true,
        });

        let response = verify_webhook_handler(
            State(config),
            Query(VerifyParams {
                mode: Some("unsubscribe".to_string()),
                verify_token: Some("verify_me".to_string()),
                challenge: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    mod reminder {
        use super::super::*;
        use crate::models::user::User;
        use crate::repositories::user_repository::{
            NewUser, RepositoryError as UserRepositoryError,
        };
        use crate::transport::{DeliveryReceipt, TransportError};
        use async_trait::async_trait;
        use chrono::Utc;
        use std::sync::Mutex;
        use uuid::Uuid;

        struct StubUsers {
            user: User,
        }

        #[async_trait]
        impl UserRepository for StubUsers {
            async fn create(&self, _user: NewUser) -> Result<User, UserRepositoryError> {
                unimplemented!("not used by reminder tests")
            }

            async fn find_by_email(
                &self,
                _email: &str,
            ) -> Result<Option<User>, UserRepositoryError> {
                Ok(None)
            }

            async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserRepositoryError> {
                Ok((self.user.id == id).then(|| self.user.clone()))
            }

            async fn set_whatsapp_number(
                &self,
                _id: Uuid,
                _number: &str,
            ) -> Result<(), UserRepositoryError> {
                Ok(())
            }

            async fn mark_whatsapp_verified(&self, _id: Uuid) -> Result<(), UserRepositoryError> {
                Ok(())
            }

            async fn delete(&self, _id: Uuid) -> Result<(), UserRepositoryError> {
                Ok(())
            }
        }

        enum Outbound {
            Text(String, String),
            Template(String, String),
        }

        #[derive(Default)]
        struct RecordingTransport {
            outbound: Mutex<Vec<Outbound>>,
        }

        #[async_trait]
        impl ChatTransport for RecordingTransport {
            async fn send_message(
                &self,
                to: &str,
                body: &str,
            ) -> Result<DeliveryReceipt, TransportError> {
                self.outbound
                    .lock()
                    .unwrap()
                    .push(Outbound::Text(to.to_string(), body.to_string()));
                Ok(DeliveryReceipt::default())
            }

            async fn send_template(
                &self,
                to: &str,
                template_name: &str,
                _language_code: &str,
            ) -> Result<DeliveryReceipt, TransportError> {
                self.outbound
                    .lock()
                    .unwrap()
                    .push(Outbound::Template(to.to_string(), template_name.to_string()));
                Ok(DeliveryReceipt::default())
            }

            async fn mark_read(&self, _message_id: &str) -> Result<(), TransportError> {
                Ok(())
            }
        }

        fn user(number: Option<&str>) -> User {
            User {
                id: Uuid::new_v4(),
                name: "Test User".to_string(),
                email: "test@example.com".to_string(),
                password_hash: "hash".to_string(),
                whatsapp_number: number.map(str::to_string),
                whatsapp_verified: number.is_some(),
                currency: "INR".to_string(),
                currency_symbol: "₹".to_string(),
                created_at: Utc::now(),
            }
        }

        async fn send(
            user: User,
            template: Option<&str>,
            transport: Arc<RecordingTransport>,
        ) -> Response {
            let user_id = user.id;
            send_reminder_handler(
                State(Arc::new(StubUsers { user }) as Arc<dyn UserRepository>),
                State(transport as Arc<dyn ChatTransport>),
                State(Arc::new(ReminderConfig {
                    template: template.map(str::to_string),
                })),
                Extension(AuthenticatedUser { user_id }),
            )
            .await
        }

        #[tokio::test]
        async fn test_plain_text_when_no_template_configured() {
            let transport = Arc::new(RecordingTransport::default());

            let response = send(user(Some("919876543210")), None, transport.clone()).await;
            assert_eq!(response.status(), StatusCode::OK);

            let outbound = transport.outbound.lock().unwrap();
            assert_eq!(outbound.len(), 1);
            match &outbound[0] {
                Outbound::Text(to, body) => {
                    assert_eq!(to, "919876543210");
                    assert_eq!(body, REMINDER_TEXT);
                }
                Outbound::Template(..) => panic!("expected a plain text send"),
            }
        }

        #[tokio::test]
        async fn test_template_used_when_configured() {
            let transport = Arc::new(RecordingTransport::default());

            let response = send(
                user(Some("919876543210")),
                Some("remind_spend"),
                transport.clone(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);

            let outbound = transport.outbound.lock().unwrap();
            assert_eq!(outbound.len(), 1);
            match &outbound[0] {
                Outbound::Template(to, name) => {
                    assert_eq!(to, "919876543210");
                    assert_eq!(name, "remind_spend");
                }
                Outbound::Text(..) => panic!("expected a template send"),
            }
        }

        #[tokio::test]
        async fn test_rejected_without_linked_number() {
            let transport = Arc::new(RecordingTransport::default());

            let response = send(user(None), None, transport.clone()).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(transport.outbound.lock().unwrap().is_empty());
        }
    }
}
