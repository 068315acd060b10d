use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::bot::command::{classify, Command, HELP_TEXT};
use crate::bot::parser::{self, ParseOutcome};
use crate::models::expense::{Expense, ExpenseSource};
use crate::models::user::User;
use crate::models::webhook::InboundMessage;
use crate::repositories::category_repository::CategoryRepository;
use crate::repositories::expense_repository::ExpenseRepository;
use crate::repositories::mapping_repository::MappingRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::statement_service::StatementService;
use crate::transport::ChatTransport;

/// Fixed rejection for senders with no active mapping
pub const NOT_REGISTERED_MESSAGE: &str =
    "❌ Your WhatsApp number is not registered. Please register at our website first.";

/// Fallback reply when a store operation fails mid-command
const GENERIC_ERROR_MESSAGE: &str = "❌ Something went wrong. Please try again.";

/// Format an amount for confirmation replies: always at least one decimal
/// digit (`120` renders as `120.0`, `120.50` as `120.5`).
fn display_amount(amount: Decimal) -> String {
    let s = amount.normalize().to_string();
    if s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}

/// Drives one inbound chat message from sender resolution to reply delivery.
///
/// Classification, parsing, and rendering live in their own modules; this is
/// only the composition point.
pub struct BotOrchestrator {
    users: Arc<dyn UserRepository>,
    mappings: Arc<dyn MappingRepository>,
    categories: Arc<dyn CategoryRepository>,
    expenses: Arc<dyn ExpenseRepository>,
    statements: Arc<StatementService>,
    transport: Arc<dyn ChatTransport>,
}

impl BotOrchestrator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        mappings: Arc<dyn MappingRepository>,
        categories: Arc<dyn CategoryRepository>,
        expenses: Arc<dyn ExpenseRepository>,
        statements: Arc<StatementService>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            users,
            mappings,
            categories,
            expenses,
            statements,
            transport,
        }
    }

    /// Handle one decoded inbound text message end to end. Errors never
    /// escape: everything chat-facing becomes reply text, everything else is
    /// logged and the event is considered processed.
    pub async fn handle_message(&self, inbound: &InboundMessage) {
        info!(sender = %inbound.sender, "processing inbound message");

        let normalized = inbound.sender.trim_start_matches('0');
        let mapping = match self
            .mappings
            .find_active_by_number(&inbound.sender, normalized)
            .await
        {
            Ok(mapping) => mapping,
            Err(e) => {
                error!(error = %e, "sender resolution failed");
                return;
            }
        };

        let Some(mapping) = mapping else {
            self.deliver(&inbound.sender, NOT_REGISTERED_MESSAGE).await;
            return;
        };

        let user = match self.users.find_by_id(mapping.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(user_id = %mapping.user_id, "active mapping points at a missing user");
                self.deliver(&inbound.sender, NOT_REGISTERED_MESSAGE).await;
                return;
            }
            Err(e) => {
                error!(error = %e, "user lookup failed");
                return;
            }
        };

        let reply = self.respond(&user, &inbound.text).await;
        self.deliver(&inbound.sender, &reply).await;

        if let Err(e) = self.transport.mark_read(&inbound.message_id).await {
            warn!(error = %e, message_id = %inbound.message_id, "failed to mark message read");
        }

        if let Err(e) = self.mappings.touch(mapping.id).await {
            warn!(error = %e, "failed to update last_interaction");
        }
    }

    /// Dispatch one command for an already-resolved user and return the
    /// reply text, using the current date.
    pub async fn respond(&self, user: &User, text: &str) -> String {
        self.respond_on(user, text, Utc::now().date_naive()).await
    }

    /// Same as `respond`, with an explicit processing date.
    pub async fn respond_on(&self, user: &User, text: &str, today: NaiveDate) -> String {
        let result = match classify(text) {
            Command::Today => self.statements.daily(user, today).await,
            Command::Week => self.statements.weekly(user, today).await,
            Command::Month => self.statements.monthly(user, today).await,
            Command::Summary => self.statements.summary(user, today).await,
            Command::Category(name) => self.statements.category(user, &name, today).await,
            Command::Help => return HELP_TEXT.to_string(),
            Command::Categories => return self.categories_reply(user.id).await,
            Command::ExpenseEntry => return self.record_expense(user, text, today).await,
        };

        result.unwrap_or_else(|e| {
            error!(error = %e, "statement generation failed");
            GENERIC_ERROR_MESSAGE.to_string()
        })
    }

    async fn categories_reply(&self, user_id: Uuid) -> String {
        let categories = match self.categories.find_active_by_user(user_id).await {
            Ok(categories) => categories,
            Err(e) => {
                error!(error = %e, "category listing failed");
                return GENERIC_ERROR_MESSAGE.to_string();
            }
        };

        if categories.is_empty() {
            return "❌ No categories found. Please add categories from the web dashboard."
                .to_string();
        }

        let mut message = String::from("📂 *Your Categories:*\n\n");
        for category in &categories {
            message.push_str(&format!("{} {}\n", category.icon, category.name));
        }
        message
    }

    async fn record_expense(&self, user: &User, text: &str, today: NaiveDate) -> String {
        let categories = match self.categories.find_active_by_user(user.id).await {
            Ok(categories) => categories,
            Err(e) => {
                error!(error = %e, "category lookup failed");
                return GENERIC_ERROR_MESSAGE.to_string();
            }
        };

        let draft = match parser::parse(text, &categories, today) {
            ParseOutcome::NoMatch => return HELP_TEXT.to_string(),
            ParseOutcome::CategoryNotFound {
                token,
                available_categories,
            } => {
                return format!(
                    "❌ Category '{token}' not found. Available categories: {available_categories}"
                );
            }
            ParseOutcome::Draft(draft) => draft,
        };

        if draft.amount <= Decimal::ZERO {
            return "❌ Amount must be greater than 0.".to_string();
        }

        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4(),
            user_id: user.id,
            category_id: draft.category.id,
            amount: draft.amount,
            description: draft.description,
            date: draft.date,
            source: ExpenseSource::Whatsapp,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        match self.expenses.create(expense).await {
            Ok(expense) => format!(
                "✅ Recorded: {}{} under {} {}",
                user.currency_symbol,
                display_amount(expense.amount),
                draft.category.icon,
                draft.category.name
            ),
            Err(e) => {
                error!(error = %e, "failed to persist expense");
                GENERIC_ERROR_MESSAGE.to_string()
            }
        }
    }

    /// Best-effort reply delivery. Failures are logged, never retried.
    async fn deliver(&self, to: &str, body: &str) {
        if let Err(e) = self.transport.send_message(to, body).await {
            error!(error = %e, %to, "failed to deliver reply");
        }
    }
}
