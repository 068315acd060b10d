use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::auth::{AuthToken, LoginRequest};
use crate::models::user::{CreateUserRequest, LinkWhatsAppRequest, User, VerifyOtpRequest};
use crate::services::auth_service::{AuthError, AuthService};

/// Error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

/// Convert AuthError to HTTP response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AuthError::DuplicateAccount => (
                StatusCode::CONFLICT,
                "duplicate_account",
                "Email or WhatsApp number already registered",
            ),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid email or password",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid authentication token",
            ),
            AuthError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "token_expired",
                "Authentication token has expired",
            ),
            AuthError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found", "User not found"),
            AuthError::MissingWhatsAppNumber => (
                StatusCode::BAD_REQUEST,
                "missing_whatsapp_number",
                "No WhatsApp number on the account",
            ),
            AuthError::OtpDeliveryFailed(_) => (
                StatusCode::BAD_GATEWAY,
                "otp_delivery_failed",
                "Failed to send OTP. Please try again.",
            ),
            AuthError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.as_str(),
            ),
        };

        let error_response = ErrorResponse::new(error_type, message);
        (status, Json(error_response)).into_response()
    }
}

fn validation_error_response(validation_errors: validator::ValidationErrors) -> Response {
    let error_message = validation_errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ");

    let error_response = ErrorResponse::new("validation_error", &error_message);
    (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
}

/// Handler for user registration
///
/// Creates the account, seeds default categories, and sends a verification
/// OTP to the supplied WhatsApp number.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User registered, OTP sent", body = User),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Email or number already registered", body = ErrorResponse),
        (status = 502, description = "OTP delivery failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(validation_errors));
    }

    match auth_service.register(request).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(user))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for user login
///
/// Authenticates a user and returns a JWT token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthToken),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthToken>, Response> {
    match auth_service.login(request).await {
        Ok(token) => Ok(Json(token)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for linking a WhatsApp number to the authenticated account
#[utoipa::path(
    post,
    path = "/api/auth/whatsapp/link",
    request_body = LinkWhatsAppRequest,
    responses(
        (status = 200, description = "OTP sent to the number"),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Number already linked elsewhere", body = ErrorResponse),
        (status = 502, description = "OTP delivery failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn link_whatsapp_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<LinkWhatsAppRequest>,
) -> Result<Json<serde_json::Value>, Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(validation_errors));
    }

    match auth_service
        .link_whatsapp(auth_user.user_id, &request.whatsapp_number)
        .await
    {
        Ok(()) => Ok(Json(json!({ "status": "otp_sent" }))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for verifying a WhatsApp OTP
///
/// On success the number becomes the account's verified chat identity and
/// inbound messages from it resolve to this user.
#[utoipa::path(
    post,
    path = "/api/auth/whatsapp/verify",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Number verified"),
        (status = 400, description = "Invalid or expired OTP", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn verify_whatsapp_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<serde_json::Value>, Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(validation_errors));
    }

    match auth_service
        .verify_whatsapp(auth_user.user_id, &request.otp)
        .await
    {
        Ok(true) => Ok(Json(json!({ "status": "verified" }))),
        Ok(false) => {
            let error_response = ErrorResponse::new("invalid_otp", "Invalid or expired OTP");
            Err((StatusCode::BAD_REQUEST, Json(error_response)).into_response())
        }
        Err(e) => Err(e.into_response()),
    }
}
