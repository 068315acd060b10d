use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::category::{Category, CreateCategoryRequest, DEFAULT_CATEGORIES};
use crate::repositories::category_repository::{CategoryRepository, RepositoryError};

/// Category service errors
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("Category with this name already exists")]
    DuplicateName,

    #[error("Category not found")]
    CategoryNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

fn map_repo_error(e: RepositoryError) -> CategoryError {
    match e {
        RepositoryError::NotFound => CategoryError::CategoryNotFound,
        RepositoryError::ConstraintViolation(_) => CategoryError::DuplicateName,
        RepositoryError::DatabaseError(msg) => CategoryError::DatabaseError(msg),
    }
}

/// Trait defining category service operations
#[async_trait]
pub trait CategoryService: Send + Sync {
    /// All active categories for a user, ordered by name
    async fn list_active(&self, user_id: Uuid) -> Result<Vec<Category>, CategoryError>;

    /// Create a custom category
    async fn create(
        &self,
        user_id: Uuid,
        request: CreateCategoryRequest,
    ) -> Result<Category, CategoryError>;

    /// Soft-delete a category (the row survives for existing expenses)
    async fn deactivate(&self, user_id: Uuid, category_id: Uuid) -> Result<(), CategoryError>;

    /// Seed the default category set for a freshly registered user
    async fn seed_defaults(&self, user_id: Uuid) -> Result<Vec<Category>, CategoryError>;
}

/// Implementation of CategoryService
pub struct CategoryServiceImpl {
    category_repository: Arc<dyn CategoryRepository>,
}

impl CategoryServiceImpl {
    pub fn new(category_repository: Arc<dyn CategoryRepository>) -> Self {
        Self {
            category_repository,
        }
    }
}

#[async_trait]
impl CategoryService for CategoryServiceImpl {
    async fn list_active(&self, user_id: Uuid) -> Result<Vec<Category>, CategoryError> {
        self.category_repository
            .find_active_by_user(user_id)
            .await
            .map_err(map_repo_error)
    }

    async fn create(
        &self,
        user_id: Uuid,
        request: CreateCategoryRequest,
    ) -> Result<Category, CategoryError> {
        let category = Category {
            id: Uuid::new_v4(),
            user_id,
            name: request.name,
            icon: request.icon.unwrap_or_else(|| "💰".to_string()),
            color: request.color.unwrap_or_else(|| "#4CAF50".to_string()),
            is_default: false,
            is_active: true,
            created_at: chrono::Utc::now(),
        };

        self.category_repository
            .create(category)
            .await
            .map_err(map_repo_error)
    }

    async fn deactivate(&self, user_id: Uuid, category_id: Uuid) -> Result<(), CategoryError> {
        self.category_repository
            .deactivate(user_id, category_id)
            .await
            .map_err(map_repo_error)
    }

    async fn seed_defaults(&self, user_id: Uuid) -> Result<Vec<Category>, CategoryError> {
        let mut created = Vec::with_capacity(DEFAULT_CATEGORIES.len());
        for (name, icon, color) in DEFAULT_CATEGORIES {
            let category = Category {
                id: Uuid::new_v4(),
                user_id,
                name: (*name).to_string(),
                icon: (*icon).to_string(),
                color: (*color).to_string(),
                is_default: true,
                is_active: true,
                created_at: chrono::Utc::now(),
            };
            created.push(
                self.category_repository
                    .create(category)
                    .await
                    .map_err(map_repo_error)?,
            );
        }
        Ok(created)
    }
}
