use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_currency_code;

/// User entity representing a registered account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Linked WhatsApp number; unique across accounts once verified
    pub whatsapp_number: Option<String>,
    pub whatsapp_verified: bool,
    pub currency: String,
    pub currency_symbol: String,
    pub created_at: DateTime<Utc>,
}

/// Request payload for user registration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "John Doe",
    "email": "john.doe@example.com",
    "password": "securepassword123",
    "whatsapp_number": "919876543210",
    "currency": "INR"
}))]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 100,
        message = "Name must be between 3 and 100 characters"
    ))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 8, max = 15, message = "Invalid WhatsApp number"))]
    pub whatsapp_number: String,

    #[validate(custom(function = "validate_currency_code"))]
    pub currency: Option<String>,
}

/// Request payload for linking a WhatsApp number to an existing account
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LinkWhatsAppRequest {
    #[validate(length(min = 8, max = 15, message = "Invalid WhatsApp number"))]
    pub whatsapp_number: String,
}

/// Request payload for submitting a one-time passcode
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({ "otp": "483920" }))]
pub struct VerifyOtpRequest {
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
}

/// Display symbol for a currency code, for the codes the dashboard offers
pub fn currency_symbol_for(code: &str) -> &'static str {
    match code {
        "INR" => "₹",
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        _ => "₹",
    }
}
