use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::bot::aliases::matches_alias;
use crate::models::category::Category;

static EXPENSE_RE: OnceLock<Regex> = OnceLock::new();

/// Grammar: `<amount> <category-token> [<description>]` where the amount is
/// a non-negative number with up to two fractional digits and the category
/// token is a single word.
fn expense_regex() -> &'static Regex {
    EXPENSE_RE.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d{1,2})?)\s+(\w+)(?:\s+(.+))?$")
            .expect("expense grammar regex is valid")
    })
}

/// A structured expense draft produced from free text. Persisting it is the
/// caller's job.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub amount: Decimal,
    pub category: Category,
    pub description: String,
    pub date: NaiveDate,
}

/// Outcome of an expense-entry parse
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The text matched the grammar and the category resolved
    Draft(ExpenseDraft),
    /// The text matched the grammar but no category matched the token
    CategoryNotFound {
        token: String,
        available_categories: String,
    },
    /// The text does not fit the grammar at all
    NoMatch,
}

/// Parse a free-text expense message against the user's active categories.
///
/// Category resolution order, first hit wins:
/// 1. exact case-insensitive name match,
/// 2. alias lookup against categories whose name is a canonical alias key.
pub fn parse(text: &str, categories: &[Category], today: NaiveDate) -> ParseOutcome {
    let Some(captures) = expense_regex().captures(text.trim()) else {
        return ParseOutcome::NoMatch;
    };

    let amount_str = &captures[1];
    let token = &captures[2];
    let description = captures
        .get(3)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let Ok(amount) = Decimal::from_str(amount_str) else {
        return ParseOutcome::NoMatch;
    };

    match resolve_category(token, categories) {
        Some(category) => ParseOutcome::Draft(ExpenseDraft {
            amount,
            category: category.clone(),
            description,
            date: today,
        }),
        None => ParseOutcome::CategoryNotFound {
            token: token.to_string(),
            available_categories: format_category_list(categories),
        },
    }
}

fn resolve_category<'a>(token: &str, categories: &'a [Category]) -> Option<&'a Category> {
    let token_lower = token.to_lowercase();

    if let Some(category) = categories
        .iter()
        .find(|c| c.name.to_lowercase() == token_lower)
    {
        return Some(category);
    }

    categories
        .iter()
        .find(|c| matches_alias(&c.name.to_lowercase(), &token_lower))
}

/// Comma-joined `<icon> <name>` listing for error replies
pub fn format_category_list(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| format!("{} {}", c.icon, c.name))
        .collect::<Vec<_>>()
        .join(", ")
}
