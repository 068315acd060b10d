use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Default categories seeded for every new account: (name, icon, color)
pub const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("Food", "🍔", "#FF6B6B"),
    ("Travel", "🚗", "#4ECDC4"),
    ("Shopping", "🛍️", "#95E1D3"),
    ("Bills", "📄", "#F38181"),
    ("Entertainment", "🎬", "#AA96DA"),
    ("Health", "💊", "#FCBAD3"),
    ("Groceries", "🛒", "#A8D8EA"),
    ("Education", "📚", "#FFDEB4"),
];

/// Category entity for organizing expenses
///
/// Names are unique per user and matched case-insensitively. Categories are
/// never removed while expenses reference them; user deletion requests flip
/// `is_active` instead.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Pets",
    "icon": "🐕",
    "color": "#6BCB77"
}))]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,

    /// Display icon, defaults to 💰
    pub icon: Option<String>,

    /// Hex color code, defaults to #4CAF50
    #[validate(length(equal = 7, message = "Color must be a hex code like #4CAF50"))]
    pub color: Option<String>,
}
