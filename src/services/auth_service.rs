use async_trait::async_trait;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::auth::{AuthToken, LoginRequest};
use crate::models::user::{currency_symbol_for, CreateUserRequest, User};
use crate::repositories::mapping_repository::MappingRepository;
use crate::repositories::user_repository::{NewUser, RepositoryError, UserRepository};
use crate::services::category_service::CategoryService;
use crate::services::otp_service::OtpService;
use crate::transport::ChatTransport;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user_id
    exp: i64,    // expiration timestamp
}

/// Authentication service errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email or WhatsApp number already registered")]
    DuplicateAccount,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("No WhatsApp number on the account")]
    MissingWhatsAppNumber,

    #[error("Failed to deliver OTP: {0}")]
    OtpDeliveryFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Trait defining authentication and account-linking operations
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new user: create the account, seed default categories,
    /// and send an OTP to the supplied WhatsApp number
    async fn register(&self, request: CreateUserRequest) -> Result<User, AuthError>;

    /// Authenticate user and return JWT token
    async fn login(&self, request: LoginRequest) -> Result<AuthToken, AuthError>;

    /// Validate JWT token and return user_id
    async fn validate_token(&self, token: &str) -> Result<Uuid, AuthError>;

    /// Attach (or replace) a WhatsApp number and send a verification OTP
    async fn link_whatsapp(&self, user_id: Uuid, number: &str) -> Result<(), AuthError>;

    /// Verify a submitted OTP; on success the active phone mapping is
    /// created so the chat channel can resolve the sender
    async fn verify_whatsapp(&self, user_id: Uuid, code: &str) -> Result<bool, AuthError>;
}

/// Implementation of AuthService
pub struct AuthServiceImpl {
    user_repository: Arc<dyn UserRepository>,
    category_service: Arc<dyn CategoryService>,
    otp_service: Arc<dyn OtpService>,
    mapping_repository: Arc<dyn MappingRepository>,
    transport: Arc<dyn ChatTransport>,
    jwt_secret: String,
}

impl AuthServiceImpl {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        category_service: Arc<dyn CategoryService>,
        otp_service: Arc<dyn OtpService>,
        mapping_repository: Arc<dyn MappingRepository>,
        transport: Arc<dyn ChatTransport>,
        jwt_secret: String,
    ) -> Self {
        Self {
            user_repository,
            category_service,
            otp_service,
            mapping_repository,
            transport,
            jwt_secret,
        }
    }

    /// Hash a password using bcrypt
    fn hash_password(password: &str) -> Result<String, AuthError> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AuthError::DatabaseError(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a hash
    fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        verify(password, hash)
            .map_err(|e| AuthError::DatabaseError(format!("Password verification failed: {}", e)))
    }

    /// Generate a JWT token for a user
    fn generate_jwt(&self, user_id: Uuid) -> Result<AuthToken, AuthError> {
        let expiration = Utc::now() + Duration::hours(24);

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::DatabaseError(format!("Token generation failed: {}", e)))?;

        Ok(AuthToken {
            token,
            expires_at: expiration,
        })
    }

    /// Decode and validate a JWT token
    fn decode_jwt(&self, token: &str) -> Result<Uuid, AuthError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            if e.to_string().contains("ExpiredSignature") {
                AuthError::TokenExpired
            } else {
                AuthError::InvalidToken
            }
        })?;

        Uuid::parse_str(&token_data.claims.sub).map_err(|_| AuthError::InvalidToken)
    }

    /// Roll back a half-registered account so the user can retry cleanly
    async fn rollback_registration(&self, user_id: Uuid) {
        if let Err(e) = self.user_repository.delete(user_id).await {
            error!(%user_id, error = %e, "failed to roll back user after OTP delivery failure");
        }
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn register(&self, request: CreateUserRequest) -> Result<User, AuthError> {
        let password_hash = Self::hash_password(&request.password)?;

        let currency = request.currency.unwrap_or_else(|| "INR".to_string());
        let currency_symbol = currency_symbol_for(&currency).to_string();

        let user = self
            .user_repository
            .create(NewUser {
                name: request.name,
                email: request.email,
                password_hash,
                whatsapp_number: Some(request.whatsapp_number.clone()),
                currency,
                currency_symbol,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::ConstraintViolation(_) => AuthError::DuplicateAccount,
                RepositoryError::DatabaseError(msg) => AuthError::DatabaseError(msg),
                RepositoryError::NotFound => {
                    AuthError::DatabaseError("Unexpected error".to_string())
                }
            })?;

        if let Err(e) = self.category_service.seed_defaults(user.id).await {
            self.rollback_registration(user.id).await;
            return Err(AuthError::DatabaseError(e.to_string()));
        }

        let challenge = self.otp_service.issue(user.id).await.map_err(|e| {
            AuthError::DatabaseError(e.to_string())
        })?;

        let message = format!(
            "Your OTP for Expense Tracker registration is: {}\n\nThis OTP is valid for 10 minutes.",
            challenge.code
        );

        if let Err(e) = self
            .transport
            .send_message(&request.whatsapp_number, &message)
            .await
        {
            warn!(error = %e, "OTP delivery failed during registration, rolling back");
            self.rollback_registration(user.id).await;
            return Err(AuthError::OtpDeliveryFailed(e.to_string()));
        }

        Ok(user)
    }

    async fn login(&self, request: LoginRequest) -> Result<AuthToken, AuthError> {
        let user = self
            .user_repository
            .find_by_email(&request.email)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        let is_valid = Self::verify_password(&request.password, &user.password_hash)?;
        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        self.generate_jwt(user.id)
    }

    async fn validate_token(&self, token: &str) -> Result<Uuid, AuthError> {
        self.decode_jwt(token)
    }

    async fn link_whatsapp(&self, user_id: Uuid, number: &str) -> Result<(), AuthError> {
        self.user_repository
            .set_whatsapp_number(user_id, number)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                RepositoryError::ConstraintViolation(_) => AuthError::DuplicateAccount,
                RepositoryError::DatabaseError(msg) => AuthError::DatabaseError(msg),
            })?;

        let challenge = self
            .otp_service
            .issue(user_id)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let message = format!(
            "Your OTP for Expense Tracker verification is: {}\n\nThis OTP is valid for 10 minutes.",
            challenge.code
        );

        self.transport
            .send_message(number, &message)
            .await
            .map_err(|e| AuthError::OtpDeliveryFailed(e.to_string()))?;

        Ok(())
    }

    async fn verify_whatsapp(&self, user_id: Uuid, code: &str) -> Result<bool, AuthError> {
        let verified = self
            .otp_service
            .verify(user_id, code)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if !verified {
            return Ok(false);
        }

        let user = self
            .user_repository
            .find_by_id(user_id)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        let number = user
            .whatsapp_number
            .ok_or(AuthError::MissingWhatsAppNumber)?;

        self.mapping_repository
            .upsert(user_id, &number)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(true)
    }
}
