/// Fixed help text sent for `help`, `commands`, and any unparseable input
pub const HELP_TEXT: &str = "📱 *Expense Tracker Commands*

*Add Expense:*
<amount> <category> [description]
Example: 120 petrol
Example: 450 food lunch

*View Statements:*
• today - Today's expenses
• week - This week's expenses
• month - This month's expenses
• summary - Monthly summary
• category <name> - Category expenses

*Other:*
• categories - List categories
• help - Show this message";

/// Classified inbound command.
///
/// Classification is priority-ordered and exact (case-insensitive); there is
/// no fuzzy matching at this layer. Anything that is not a recognized
/// command falls through to the expense parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `today`
    Today,
    /// `week` or `this week`
    Week,
    /// `month` or `this month`
    Month,
    /// `summary`
    Summary,
    /// `category <name>`; carries the name with its original casing
    Category(String),
    /// `help` or `commands`
    Help,
    /// `categories`
    Categories,
    /// Everything else: attempt an expense-entry parse
    ExpenseEntry,
}

/// Classify an inbound message, first match wins.
pub fn classify(text: &str) -> Command {
    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();

    match lowered.as_str() {
        "today" => Command::Today,
        "week" | "this week" => Command::Week,
        "month" | "this month" => Command::Month,
        "summary" => Command::Summary,
        "help" | "commands" => Command::Help,
        "categories" => Command::Categories,
        _ if lowered.starts_with("category ") => {
            // "category " is ASCII, so the byte offset is safe on the
            // original casing too
            Command::Category(trimmed["category ".len()..].trim().to_string())
        }
        _ => Command::ExpenseEntry,
    }
}
