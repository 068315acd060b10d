use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::User;

/// Repository errors for database operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Resource not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Fields required to insert a new user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub whatsapp_number: Option<String>,
    pub currency: String,
    pub currency_symbol: String,
}

/// Trait defining user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Find a user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    /// Set or replace the account's WhatsApp number (resets the verified flag)
    async fn set_whatsapp_number(&self, id: Uuid, number: &str) -> Result<(), RepositoryError>;

    /// Flip the verified flag after a successful OTP check
    async fn mark_whatsapp_verified(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Remove a user entirely (registration rollback when OTP delivery fails)
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

type UserRow = (
    Uuid,
    String,
    String,
    String,
    Option<String>,
    bool,
    String,
    String,
    DateTime<Utc>,
);

fn row_to_user(row: UserRow) -> User {
    User {
        id: row.0,
        name: row.1,
        email: row.2,
        password_hash: row.3,
        whatsapp_number: row.4,
        whatsapp_verified: row.5,
        currency: row.6,
        currency_symbol: row.7,
        created_at: row.8,
    }
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, whatsapp_number, whatsapp_verified, currency, currency_symbol, created_at";

/// PostgreSQL implementation of UserRepository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO users (name, email, password_hash, whatsapp_number, currency, currency_symbol)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );

        let result = sqlx::query_as::<_, UserRow>(&query)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.whatsapp_number)
            .bind(&user.currency)
            .bind(&user.currency_symbol)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(row_to_user(row)),
            Err(sqlx::Error::Database(db_err)) => {
                if db_err.is_unique_violation() {
                    Err(RepositoryError::ConstraintViolation(
                        "Email or WhatsApp number already in use".to_string(),
                    ))
                } else {
                    Err(RepositoryError::DatabaseError(db_err.to_string()))
                }
            }
            Err(e) => Err(RepositoryError::DatabaseError(e.to_string())),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(row_to_user))
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(row_to_user))
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    async fn set_whatsapp_number(&self, id: Uuid, number: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET whatsapp_number = $2, whatsapp_verified = FALSE WHERE id = $1",
        )
        .bind(id)
        .bind(number)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(RepositoryError::NotFound),
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                RepositoryError::ConstraintViolation(
                    "WhatsApp number already linked to another account".to_string(),
                ),
            ),
            Err(e) => Err(RepositoryError::DatabaseError(e.to_string())),
        }
    }

    async fn mark_whatsapp_verified(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET whatsapp_verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
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
