use std::env;

/// Errors raised while assembling configuration from the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Which outbound message provider to wire up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageProvider {
    MetaCloud,
    Twilio,
}

/// Application configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: String,

    pub provider: MessageProvider,

    /// Token echoed back during the webhook verification handshake
    pub webhook_verify_token: String,
    /// App secret used for X-Hub-Signature-256 validation
    pub webhook_app_secret: String,
    /// Signature validation toggle. Defaults to on; turning it off is an
    /// explicit operator decision, never the shipped state.
    pub verify_webhook_signatures: bool,

    /// Approved template used for spend reminders; plain text when unset
    pub reminder_template: Option<String>,

    // Meta Cloud API
    pub meta_access_token: String,
    pub meta_phone_number_id: String,
    /// Country code assumed for bare 10-digit numbers
    pub default_country_code: String,

    // Twilio
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_whatsapp_number: String,
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    env::var(var).map_err(|_| ConfigError::MissingVar(var))
}

fn optional(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match optional("WHATSAPP_PROVIDER", "meta").as_str() {
            "meta" => MessageProvider::MetaCloud,
            "twilio" => MessageProvider::Twilio,
            other => {
                return Err(ConfigError::InvalidValue {
                    var: "WHATSAPP_PROVIDER",
                    value: other.to_string(),
                })
            }
        };

        let verify_webhook_signatures =
            match optional("VERIFY_WEBHOOK_SIGNATURES", "true").as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                other => {
                    return Err(ConfigError::InvalidValue {
                        var: "VERIFY_WEBHOOK_SIGNATURES",
                        value: other.to_string(),
                    })
                }
            };

        let config = Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            host: optional("HOST", "127.0.0.1"),
            port: optional("PORT", "8080"),
            provider,
            webhook_verify_token: required("WHATSAPP_VERIFY_TOKEN")?,
            webhook_app_secret: optional("WHATSAPP_APP_SECRET", ""),
            verify_webhook_signatures,
            reminder_template: env::var("WHATSAPP_REMINDER_TEMPLATE")
                .ok()
                .filter(|v| !v.is_empty()),
            meta_access_token: optional("WHATSAPP_ACCESS_TOKEN", ""),
            meta_phone_number_id: optional("WHATSAPP_PHONE_NUMBER_ID", ""),
            default_country_code: optional("WHATSAPP_DEFAULT_COUNTRY_CODE", "91"),
            twilio_account_sid: optional("TWILIO_ACCOUNT_SID", ""),
            twilio_auth_token: optional("TWILIO_AUTH_TOKEN", ""),
            twilio_whatsapp_number: optional("TWILIO_WHATSAPP_NUMBER", ""),
        };

        if config.verify_webhook_signatures && config.webhook_app_secret.is_empty() {
            return Err(ConfigError::InvalidValue {
                var: "WHATSAPP_APP_SECRET",
                value: "(empty with VERIFY_WEBHOOK_SIGNATURES=true)".to_string(),
            });
        }

        Ok(config)
    }
}
