use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::expense::{Expense, ExpenseSource};
use crate::models::reports::{CategoryTotal, DateRange, ExpenseLine};

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

/// Trait defining expense repository operations.
///
/// Every read here is over the live (non-deleted) set; soft-deleted rows are
/// only reachable through `purge`.
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// Create a new expense
    async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError>;

    /// Find an expense by ID (including soft-deleted rows)
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError>;

    /// Most recent expenses for a user, date-descending
    async fn find_recent(&self, user_id: Uuid, limit: i64)
        -> Result<Vec<Expense>, RepositoryError>;

    /// Expense lines (joined with category display fields) in an inclusive
    /// date range
    async fn find_lines_in_range(
        &self,
        user_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<ExpenseLine>, RepositoryError>;

    /// Expense lines for one category in an inclusive date range
    async fn find_lines_by_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<ExpenseLine>, RepositoryError>;

    /// Database-side per-category totals over a date range, largest first
    async fn sum_by_category(
        &self,
        user_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<CategoryTotal>, RepositoryError>;

    /// Total spend over a date range
    async fn sum_in_range(
        &self,
        user_id: Uuid,
        range: DateRange,
    ) -> Result<Decimal, RepositoryError>;

    /// Soft-delete: set the flag and timestamp, keep the row
    async fn soft_delete(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), RepositoryError>;

    /// Irreversibly remove a row (administrative use)
    async fn purge(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), RepositoryError>;
}

type ExpenseRow = (
    Uuid,
    Uuid,
    Uuid,
    Decimal,
    String,
    NaiveDate,
    String,
    bool,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn row_to_expense(row: ExpenseRow) -> Expense {
    Expense {
        id: row.0,
        user_id: row.1,
        category_id: row.2,
        amount: row.3,
        description: row.4,
        date: row.5,
        source: ExpenseSource::from_db_string(&row.6).unwrap_or(ExpenseSource::Api),
        is_deleted: row.7,
        deleted_at: row.8,
        created_at: row.9,
        updated_at: row.10,
    }
}

const EXPENSE_COLUMNS: &str = "id, user_id, category_id, amount, description, date, source, is_deleted, deleted_at, created_at, updated_at";

/// PostgreSQL implementation of ExpenseRepository
pub struct PostgresExpenseRepository {
    pool: PgPool,
}

impl PostgresExpenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExpenseRepository for PostgresExpenseRepository {
    async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO expenses (id, user_id, category_id, amount, description, date, source)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {EXPENSE_COLUMNS}
            "#
        );

        let result = sqlx::query_as::<_, ExpenseRow>(&query)
            .bind(expense.id)
            .bind(expense.user_id)
            .bind(expense.category_id)
            .bind(expense.amount)
            .bind(&expense.description)
            .bind(expense.date)
            .bind(expense.source.to_db_string())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(row_to_expense(row)),
            Err(sqlx::Error::Database(db_err)) => {
                if db_err.is_foreign_key_violation() {
                    Err(RepositoryError::ConstraintViolation(
                        "Category does not exist".to_string(),
                    ))
                } else {
                    Err(RepositoryError::DatabaseError(db_err.to_string()))
                }
            }
            Err(e) => Err(RepositoryError::DatabaseError(e.to_string())),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError> {
        let query = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1");

        sqlx::query_as::<_, ExpenseRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(row_to_expense))
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    async fn find_recent(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Expense>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
            FROM expenses
            WHERE user_id = $1 AND is_deleted = FALSE
            ORDER BY date DESC, created_at DESC
            LIMIT $2
            "#
        );

        sqlx::query_as::<_, ExpenseRow>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(row_to_expense).collect())
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    async fn find_lines_in_range(
        &self,
        user_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<ExpenseLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, String, Decimal, NaiveDate)>(
            r#"
            SELECT c.name, c.icon, e.amount, e.date
            FROM expenses e
            JOIN categories c ON e.category_id = c.id
            WHERE e.user_id = $1
                AND e.is_deleted = FALSE
                AND e.date BETWEEN $2 AND $3
            "#,
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(category_name, category_icon, amount, date)| ExpenseLine {
                category_name,
                category_icon,
                amount,
                date,
            })
            .collect())
    }

    async fn find_lines_by_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<ExpenseLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, String, Decimal, NaiveDate)>(
            r#"
            SELECT c.name, c.icon, e.amount, e.date
            FROM expenses e
            JOIN categories c ON e.category_id = c.id
            WHERE e.user_id = $1
                AND e.category_id = $2
                AND e.is_deleted = FALSE
                AND e.date BETWEEN $3 AND $4
            "#,
        )
        .bind(user_id)
        .bind(category_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(category_name, category_icon, amount, date)| ExpenseLine {
                category_name,
                category_icon,
                amount,
                date,
            })
            .collect())
    }

    async fn sum_by_category(
        &self,
        user_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<CategoryTotal>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, String, Decimal)>(
            r#"
            SELECT c.name, c.icon, SUM(e.amount) AS total
            FROM expenses e
            JOIN categories c ON e.category_id = c.id
            WHERE e.user_id = $1
                AND e.is_deleted = FALSE
                AND e.date BETWEEN $2 AND $3
            GROUP BY c.name, c.icon
            ORDER BY total DESC
            "#,
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(category_name, category_icon, total)| CategoryTotal {
                category_name,
                category_icon,
                total,
            })
            .collect())
    }

    async fn sum_in_range(
        &self,
        user_id: Uuid,
        range: DateRange,
    ) -> Result<Decimal, RepositoryError> {
        sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM expenses
            WHERE user_id = $1 AND is_deleted = FALSE AND date BETWEEN $2 AND $3
            "#,
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }

    async fn soft_delete(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND is_deleted = FALSE
            "#,
        )
        .bind(expense_id)
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

    async fn purge(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
            .bind(expense_id)
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
