use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::otp::OtpChallenge;
use crate::repositories::otp_repository::{OtpRepository, RepositoryError};
use crate::repositories::user_repository::UserRepository;

/// Clock abstraction so expiry can be tested without waiting
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used in production
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// OTP service errors
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Trait defining OTP issuance and verification.
///
/// Each issuance is an independent challenge row; verification checks the
/// latest unconsumed one against the clock and consumes it on success, so a
/// stale or replayed code can never verify.
#[async_trait]
pub trait OtpService: Send + Sync {
    /// Issue a fresh 6-digit passcode for a user
    async fn issue(&self, user_id: Uuid) -> Result<OtpChallenge, OtpError>;

    /// Check a submitted code. Returns false on mismatch, expiry, or when no
    /// challenge is outstanding; marks the user's number verified on success.
    async fn verify(&self, user_id: Uuid, code: &str) -> Result<bool, OtpError>;
}

/// Implementation of OtpService
pub struct OtpServiceImpl {
    otp_repository: Arc<dyn OtpRepository>,
    user_repository: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl OtpServiceImpl {
    pub fn new(
        otp_repository: Arc<dyn OtpRepository>,
        user_repository: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            otp_repository,
            user_repository,
            clock,
        }
    }

    fn generate_code() -> String {
        rand::thread_rng().gen_range(100_000..=999_999).to_string()
    }
}

impl From<RepositoryError> for OtpError {
    fn from(e: RepositoryError) -> Self {
        OtpError::DatabaseError(e.to_string())
    }
}

#[async_trait]
impl OtpService for OtpServiceImpl {
    async fn issue(&self, user_id: Uuid) -> Result<OtpChallenge, OtpError> {
        // An older outstanding challenge is simply superseded: verification
        // only ever consults the latest one.
        let challenge = OtpChallenge {
            id: Uuid::new_v4(),
            user_id,
            code: Self::generate_code(),
            issued_at: self.clock.now(),
            consumed_at: None,
        };

        Ok(self.otp_repository.create(challenge).await?)
    }

    async fn verify(&self, user_id: Uuid, code: &str) -> Result<bool, OtpError> {
        let Some(challenge) = self.otp_repository.find_latest_active(user_id).await? else {
            return Ok(false);
        };

        let now = self.clock.now();
        if !challenge.is_valid_at(now) {
            return Ok(false);
        }

        if challenge.code != code {
            return Ok(false);
        }

        self.otp_repository.consume(challenge.id, now).await?;
        self.user_repository
            .mark_whatsapp_verified(user_id)
            .await
            .map_err(|e| OtpError::DatabaseError(e.to_string()))?;

        Ok(true)
    }
}
