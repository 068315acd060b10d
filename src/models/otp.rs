use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seconds an issued passcode stays valid
pub const OTP_VALIDITY_SECONDS: i64 = 600;

/// A short-lived one-time passcode issued for phone-number verification.
///
/// Each issuance is its own row keyed by user; verification compares against
/// a clock and marks the row consumed, so concurrent issue/verify attempts
/// stay independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl OtpChallenge {
    /// Whether the challenge is still inside its validity window at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none()
            && (now - self.issued_at).num_seconds() <= OTP_VALIDITY_SECONDS
    }
}
