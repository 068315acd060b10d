use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::otp::OtpChallenge;

/// Repository errors for database operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Resource not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Trait defining OTP challenge repository operations
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Store a freshly issued challenge
    async fn create(&self, challenge: OtpChallenge) -> Result<OtpChallenge, RepositoryError>;

    /// Most recently issued unconsumed challenge for a user
    async fn find_latest_active(
        &self,
        user_id: Uuid,
    ) -> Result<Option<OtpChallenge>, RepositoryError>;

    /// Mark a challenge consumed so it can never match again
    async fn consume(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError>;
}

type OtpRow = (Uuid, Uuid, String, DateTime<Utc>, Option<DateTime<Utc>>);

fn row_to_challenge(row: OtpRow) -> OtpChallenge {
    OtpChallenge {
        id: row.0,
        user_id: row.1,
        code: row.2,
        issued_at: row.3,
        consumed_at: row.4,
    }
}

/// PostgreSQL implementation of OtpRepository
pub struct PostgresOtpRepository {
    pool: PgPool,
}

impl PostgresOtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpRepository for PostgresOtpRepository {
    async fn create(&self, challenge: OtpChallenge) -> Result<OtpChallenge, RepositoryError> {
        let row = sqlx::query_as::<_, OtpRow>(
            r#"
            INSERT INTO otp_challenges (id, user_id, code, issued_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, code, issued_at, consumed_at
            "#,
        )
        .bind(challenge.id)
        .bind(challenge.user_id)
        .bind(&challenge.code)
        .bind(challenge.issued_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(row_to_challenge(row))
    }

    async fn find_latest_active(
        &self,
        user_id: Uuid,
    ) -> Result<Option<OtpChallenge>, RepositoryError> {
        sqlx::query_as::<_, OtpRow>(
            r#"
            SELECT id, user_id, code, issued_at, consumed_at
            FROM otp_challenges
            WHERE user_id = $1 AND consumed_at IS NULL
            ORDER BY issued_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(row_to_challenge))
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    async fn consume(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE otp_challenges SET consumed_at = $2 WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }
}
