use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::mapping::WhatsAppMapping;

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

/// Trait defining phone-mapping repository operations
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// Create or refresh the mapping for a user after OTP verification
    async fn upsert(
        &self,
        user_id: Uuid,
        whatsapp_number: &str,
    ) -> Result<WhatsAppMapping, RepositoryError>;

    /// Resolve an inbound sender. Providers report numbers inconsistently,
    /// so both the raw number and a leading-zero-stripped variant are tried.
    async fn find_active_by_number(
        &self,
        raw: &str,
        normalized: &str,
    ) -> Result<Option<WhatsAppMapping>, RepositoryError>;

    /// Bump last_interaction after handling an inbound message
    async fn touch(&self, id: Uuid) -> Result<(), RepositoryError>;
}

type MappingRow = (Uuid, Uuid, String, bool, DateTime<Utc>, DateTime<Utc>);

fn row_to_mapping(row: MappingRow) -> WhatsAppMapping {
    WhatsAppMapping {
        id: row.0,
        user_id: row.1,
        whatsapp_number: row.2,
        is_active: row.3,
        last_interaction: row.4,
        created_at: row.5,
    }
}

const MAPPING_COLUMNS: &str =
    "id, user_id, whatsapp_number, is_active, last_interaction, created_at";

/// PostgreSQL implementation of MappingRepository
pub struct PostgresMappingRepository {
    pool: PgPool,
}

impl PostgresMappingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingRepository for PostgresMappingRepository {
    async fn upsert(
        &self,
        user_id: Uuid,
        whatsapp_number: &str,
    ) -> Result<WhatsAppMapping, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO whatsapp_mappings (user_id, whatsapp_number)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
                SET whatsapp_number = EXCLUDED.whatsapp_number,
                    is_active = TRUE,
                    last_interaction = NOW()
            RETURNING {MAPPING_COLUMNS}
            "#
        );

        let result = sqlx::query_as::<_, MappingRow>(&query)
            .bind(user_id)
            .bind(whatsapp_number)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(row_to_mapping(row)),
            Err(sqlx::Error::Database(db_err)) => {
                if db_err.is_unique_violation() {
                    Err(RepositoryError::ConstraintViolation(
                        "WhatsApp number already mapped to another account".to_string(),
                    ))
                } else {
                    Err(RepositoryError::DatabaseError(db_err.to_string()))
                }
            }
            Err(e) => Err(RepositoryError::DatabaseError(e.to_string())),
        }
    }

    async fn find_active_by_number(
        &self,
        raw: &str,
        normalized: &str,
    ) -> Result<Option<WhatsAppMapping>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {MAPPING_COLUMNS}
            FROM whatsapp_mappings
            WHERE is_active = TRUE AND whatsapp_number IN ($1, $2)
            LIMIT 1
            "#
        );

        sqlx::query_as::<_, MappingRow>(&query)
            .bind(raw)
            .bind(normalized)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(row_to_mapping))
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    async fn touch(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE whatsapp_mappings SET last_interaction = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }
}
