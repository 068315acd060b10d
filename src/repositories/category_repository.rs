use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::category::Category;

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

/// Trait defining category repository operations
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: Category) -> Result<Category, RepositoryError>;

    /// Find a category by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepositoryError>;

    /// All active categories for a user, ordered by name
    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Vec<Category>, RepositoryError>;

    /// Case-insensitive lookup of one active category by name
    async fn find_active_by_name(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> Result<Option<Category>, RepositoryError>;

    /// Soft-delete: flips is_active off, the row stays
    async fn deactivate(&self, user_id: Uuid, category_id: Uuid) -> Result<(), RepositoryError>;
}

type CategoryRow = (Uuid, Uuid, String, String, String, bool, bool, DateTime<Utc>);

fn row_to_category(row: CategoryRow) -> Category {
    Category {
        id: row.0,
        user_id: row.1,
        name: row.2,
        icon: row.3,
        color: row.4,
        is_default: row.5,
        is_active: row.6,
        created_at: row.7,
    }
}

const CATEGORY_COLUMNS: &str =
    "id, user_id, name, icon, color, is_default, is_active, created_at";

/// PostgreSQL implementation of CategoryRepository
pub struct PostgresCategoryRepository {
    pool: PgPool,
}

impl PostgresCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn create(&self, category: Category) -> Result<Category, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO categories (id, user_id, name, icon, color, is_default, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CATEGORY_COLUMNS}
            "#
        );

        let result = sqlx::query_as::<_, CategoryRow>(&query)
            .bind(category.id)
            .bind(category.user_id)
            .bind(&category.name)
            .bind(&category.icon)
            .bind(&category.color)
            .bind(category.is_default)
            .bind(category.is_active)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(row_to_category(row)),
            Err(sqlx::Error::Database(db_err)) => {
                if db_err.is_unique_violation() {
                    Err(RepositoryError::ConstraintViolation(
                        "Category with this name already exists for user".to_string(),
                    ))
                } else {
                    Err(RepositoryError::DatabaseError(db_err.to_string()))
                }
            }
            Err(e) => Err(RepositoryError::DatabaseError(e.to_string())),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepositoryError> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");

        sqlx::query_as::<_, CategoryRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(row_to_category))
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Vec<Category>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {CATEGORY_COLUMNS}
            FROM categories
            WHERE user_id = $1 AND is_active = TRUE
            ORDER BY name ASC
            "#
        );

        sqlx::query_as::<_, CategoryRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(row_to_category).collect())
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    async fn find_active_by_name(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> Result<Option<Category>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {CATEGORY_COLUMNS}
            FROM categories
            WHERE user_id = $1 AND LOWER(name) = LOWER($2) AND is_active = TRUE
            "#
        );

        sqlx::query_as::<_, CategoryRow>(&query)
            .bind(user_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(row_to_category))
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    async fn deactivate(&self, user_id: Uuid, category_id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE categories SET is_active = FALSE WHERE id = $1 AND user_id = $2",
        )
        .bind(category_id)
        .bind(user_id)
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
