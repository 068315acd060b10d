use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::reports::{CategoryTotal, DateRange, ExpenseLine};
use crate::models::user::User;
use crate::repositories::category_repository::CategoryRepository;
use crate::repositories::expense_repository::ExpenseRepository;
use crate::services::expense_service::{month_start, week_start};

/// Statement service errors
#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Renders spending reports as chat-ready text.
///
/// All reports run over the live (non-deleted) expense set of one user.
/// Per-group sums are accumulated as floats for display only; the stored
/// amounts stay exact decimals.
pub struct StatementService {
    expense_repository: Arc<dyn ExpenseRepository>,
    category_repository: Arc<dyn CategoryRepository>,
}

impl StatementService {
    pub fn new(
        expense_repository: Arc<dyn ExpenseRepository>,
        category_repository: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            expense_repository,
            category_repository,
        }
    }

    /// Expenses dated exactly `today`
    pub async fn daily(&self, user: &User, today: NaiveDate) -> Result<String, StatementError> {
        let lines = self
            .lines_in_range(user.id, today, today)
            .await?;
        let title = format!("📊 Today's Expenses ({})", today.format("%d %b %Y"));
        Ok(render_report(&title, &lines, &user.currency_symbol))
    }

    /// Expenses from the Monday of the current week through `today`,
    /// inclusive both ends
    pub async fn weekly(&self, user: &User, today: NaiveDate) -> Result<String, StatementError> {
        let start = week_start(today);
        let lines = self.lines_in_range(user.id, start, today).await?;
        let title = format!(
            "📊 This Week's Expenses ({} - {})",
            start.format("%d %b"),
            today.format("%d %b")
        );
        Ok(render_report(&title, &lines, &user.currency_symbol))
    }

    /// Expenses from the first of the current month through `today`
    pub async fn monthly(&self, user: &User, today: NaiveDate) -> Result<String, StatementError> {
        let start = month_start(today);
        let lines = self.lines_in_range(user.id, start, today).await?;
        let title = format!("📊 This Month's Expenses ({})", start.format("%B %Y"));
        Ok(render_report(&title, &lines, &user.currency_symbol))
    }

    /// Last 30 days of one named category. The name must match an active
    /// category exactly (case-insensitively); otherwise a not-found text is
    /// returned instead of a report.
    pub async fn category(
        &self,
        user: &User,
        category_name: &str,
        today: NaiveDate,
    ) -> Result<String, StatementError> {
        let category = self
            .category_repository
            .find_active_by_name(user.id, category_name)
            .await
            .map_err(|e| StatementError::DatabaseError(e.to_string()))?;

        let Some(category) = category else {
            return Ok(format!("❌ Category '{category_name}' not found."));
        };

        let range = DateRange {
            start: today - chrono::Duration::days(30),
            end: today,
        };
        let lines = self
            .expense_repository
            .find_lines_by_category(user.id, category.id, range)
            .await
            .map_err(|e| StatementError::DatabaseError(e.to_string()))?;

        let title = format!("📊 {} {} - Last 30 Days", category.icon, category.name);
        Ok(render_report(&title, &lines, &user.currency_symbol))
    }

    /// Current month grouped per category; totals come from a database-side
    /// aggregate rather than in-process grouping
    pub async fn summary(&self, user: &User, today: NaiveDate) -> Result<String, StatementError> {
        let start = month_start(today);
        let totals = self
            .expense_repository
            .sum_by_category(
                user.id,
                DateRange {
                    start,
                    end: today,
                },
            )
            .await
            .map_err(|e| StatementError::DatabaseError(e.to_string()))?;

        let title = format!("📊 Monthly Summary ({})", start.format("%B %Y"));
        Ok(render_summary(&title, &totals, &user.currency_symbol))
    }

    async fn lines_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExpenseLine>, StatementError> {
        self.expense_repository
            .find_lines_in_range(user_id, DateRange { start, end })
            .await
            .map_err(|e| StatementError::DatabaseError(e.to_string()))
    }
}

/// Group lines by `"<icon> <name>"`, sum per group, and render one report.
fn render_report(title: &str, lines: &[ExpenseLine], symbol: &str) -> String {
    if lines.is_empty() {
        return format!("{title}\n\nNo expenses recorded.");
    }

    let mut groups: HashMap<String, f64> = HashMap::new();
    for line in lines {
        let key = format!("{} {}", line.category_icon, line.category_name);
        *groups.entry(key).or_insert(0.0) += line.amount.to_f64().unwrap_or(0.0);
    }

    let mut sorted: Vec<(String, f64)> = groups.into_iter().collect();
    sorted.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut message = format!("{title}\n\n");
    let mut total = 0.0;
    for (key, amount) in &sorted {
        message.push_str(&format!("{key}: {symbol}{amount:.2}\n"));
        total += amount;
    }
    message.push_str(&format!("\n{}\n", "=".repeat(25)));
    message.push_str(&format!("💰 Total: {symbol}{total:.2}"));
    message
}

/// Render pre-aggregated per-category totals (monthly summary).
fn render_summary(title: &str, totals: &[CategoryTotal], symbol: &str) -> String {
    if totals.is_empty() {
        return format!("{title}\n\nNo expenses recorded yet.");
    }

    let mut message = format!("{title}\n\n");
    let mut total = 0.0;
    for item in totals {
        let amount = item.total.to_f64().unwrap_or(0.0);
        total += amount;
        message.push_str(&format!(
            "{} {}: {symbol}{amount:.2}\n",
            item.category_icon, item.category_name
        ));
    }
    message.push_str(&format!("\n{}\n", "=".repeat(25)));
    message.push_str(&format!("💰 Total: {symbol}{total:.2}"));
    message
}
