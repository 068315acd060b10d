use std::collections::HashMap;
use std::sync::OnceLock;

static ALIASES: OnceLock<HashMap<&'static str, &'static [&'static str]>> = OnceLock::new();

/// Fixed alias table keyed by canonical category name (lowercase).
///
/// A token only resolves through an alias when the user actually owns an
/// active category named after the canonical key; the table itself carries
/// no category data.
pub fn alias_table() -> &'static HashMap<&'static str, &'static [&'static str]> {
    ALIASES.get_or_init(|| {
        let mut table: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        table.insert(
            "food",
            &["eat", "lunch", "dinner", "breakfast", "snack", "meal"][..],
        );
        table.insert(
            "travel",
            &["transport", "taxi", "uber", "bus", "train", "petrol", "fuel"][..],
        );
        table.insert("shopping", &["shop", "clothes", "buy"][..]);
        table.insert("groceries", &["grocery", "vegetables", "fruits", "market"][..]);
        table.insert("entertainment", &["movie", "cinema", "game", "fun"][..]);
        table.insert("health", &["medical", "doctor", "medicine", "hospital"][..]);
        table.insert("bills", &["electricity", "water", "internet", "mobile"][..]);
        table
    })
}

/// Whether `token` is an alias of the canonical category name. Both inputs
/// are expected lowercase.
pub fn matches_alias(canonical: &str, token: &str) -> bool {
    alias_table()
        .get(canonical)
        .is_some_and(|aliases| aliases.contains(&token))
}
