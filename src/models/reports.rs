use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Inclusive date range filter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One expense row joined with its category display fields, as consumed by
/// the statement generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseLine {
    pub category_name: String,
    pub category_icon: String,
    pub amount: Decimal,
    pub date: NaiveDate,
}

/// Per-category aggregate produced by a database-side SUM
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryTotal {
    pub category_name: String,
    pub category_icon: String,
    pub total: Decimal,
}

/// Dashboard headline figures
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub today_total: Decimal,
    pub week_total: Decimal,
    pub month_total: Decimal,
    pub by_category: Vec<CategoryTotal>,
}
