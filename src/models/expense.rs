use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_positive_amount;

/// How an expense entered the system. Provenance only, no behavioral effect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseSource {
    Whatsapp,
    Web,
    Api,
}

impl ExpenseSource {
    pub fn to_db_string(self) -> &'static str {
        match self {
            ExpenseSource::Whatsapp => "whatsapp",
            ExpenseSource::Web => "web",
            ExpenseSource::Api => "api",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "whatsapp" => Some(ExpenseSource::Whatsapp),
            "web" => Some(ExpenseSource::Web),
            "api" => Some(ExpenseSource::Api),
            _ => None,
        }
    }
}

/// Expense entity representing a single spending record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub source: ExpenseSource,
    /// Soft delete: flagged rows are invisible to listings and statements
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating an expense from the web dashboard or API
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "category_id": "550e8400-e29b-41d4-a716-446655440000",
    "amount": 42.50,
    "description": "weekly shop",
    "date": "2026-08-04"
}))]
pub struct CreateExpenseRequest {
    pub category_id: Uuid,

    #[validate(custom(function = "validate_positive_amount"))]
    #[schema(minimum = 0.01, example = 42.50)]
    pub amount: Decimal,

    #[validate(length(max = 255, message = "Description must be at most 255 characters"))]
    pub description: Option<String>,

    /// Defaults to the submission day
    #[schema(format = "date", example = "2026-08-04")]
    pub date: Option<NaiveDate>,
}
