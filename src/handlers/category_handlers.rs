use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::category::{Category, CreateCategoryRequest};
use crate::services::category_service::{CategoryError, CategoryService};

/// Error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

/// Convert CategoryError to HTTP response
impl IntoResponse for CategoryError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            CategoryError::DuplicateName => (
                StatusCode::CONFLICT,
                "duplicate_name",
                "Category with this name already exists",
            ),
            CategoryError::CategoryNotFound => (
                StatusCode::NOT_FOUND,
                "category_not_found",
                "Category not found",
            ),
            CategoryError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.as_str(),
            ),
        };

        let error_response = ErrorResponse::new(error_type, message);
        (status, Json(error_response)).into_response()
    }
}

/// Handler for listing the user's active categories
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Active categories, ordered by name", body = Vec<Category>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn list_categories_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Category>>, Response> {
    match category_service.list_active(auth_user.user_id).await {
        Ok(categories) => Ok(Json(categories)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for creating a category
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Name already in use", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn create_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), Response> {
    if let Err(validation_errors) = request.validate() {
        let error_message = validation_errors
            .field_errors()
            .iter()
            .map(|(field, errors)| {
                let messages: Vec<String> = errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        let error_response = ErrorResponse::new("validation_error", &error_message);
        return Err((StatusCode::BAD_REQUEST, Json(error_response)).into_response());
    }

    match category_service.create(auth_user.user_id, request).await {
        Ok(category) => Ok((StatusCode::CREATED, Json(category))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for deactivating a category
///
/// Soft-delete only; expenses referencing the category keep their rows.
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 204, description = "Category deactivated"),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn deactivate_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, Response> {
    match category_service
        .deactivate(auth_user.user_id, category_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // In-memory CategoryService for handler tests
    struct StubCategoryService {
        categories: Mutex<HashMap<Uuid, Category>>,
    }

    impl StubCategoryService {
        fn new() -> Self {
            Self {
                categories: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl CategoryService for StubCategoryService {
        async fn list_active(&self, user_id: Uuid) -> Result<Vec<Category>, CategoryError> {
            let mut result: Vec<Category> = self
                .categories
                .lock()
                .unwrap()
                .values()
                .filter(|c| c.user_id == user_id && c.is_active)
                .cloned()
                .collect();
            result.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(result)
        }

        async fn create(
            &self,
            user_id: Uuid,
            request: CreateCategoryRequest,
        ) -> Result<Category, CategoryError> {
            let mut categories = self.categories.lock().unwrap();
            if categories
                .values()
                .any(|c| c.user_id == user_id && c.name.eq_ignore_ascii_case(&request.name))
            {
                return Err(CategoryError::DuplicateName);
            }
            let category = Category {
                id: Uuid::new_v4(),
                user_id,
                name: request.name,
                icon: request.icon.unwrap_or_else(|| "💰".to_string()),
                color: request.color.unwrap_or_else(|| "#4CAF50".to_string()),
                is_default: false,
                is_active: true,
                created_at: Utc::now(),
            };
            categories.insert(category.id, category.clone());
            Ok(category)
        }

        async fn deactivate(
            &self,
            user_id: Uuid,
            category_id: Uuid,
        ) -> Result<(), CategoryError> {
            let mut categories = self.categories.lock().unwrap();
            match categories.get_mut(&category_id) {
                Some(category) if category.user_id == user_id => {
                    category.is_active = false;
                    Ok(())
                }
                _ => Err(CategoryError::CategoryNotFound),
            }
        }

        async fn seed_defaults(&self, _user_id: Uuid) -> Result<Vec<Category>, CategoryError> {
            Ok(Vec::new())
        }
    }

    fn request(name: &str) -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: name.to_string(),
            icon: Some("🐕".to_string()),
            color: Some("#6BCB77".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let service: Arc<dyn CategoryService> = Arc::new(StubCategoryService::new());
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
        };

        let (status, Json(created)) = create_category_handler(
            State(service.clone()),
            Extension(user.clone()),
            Json(request("Pets")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.name, "Pets");

        let Json(listed) = list_categories_handler(State(service), Extension(user))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Pets");
    }

    #[tokio::test]
    async fn test_create_duplicate_rejected() {
        let service: Arc<dyn CategoryService> = Arc::new(StubCategoryService::new());
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
        };

        create_category_handler(
            State(service.clone()),
            Extension(user.clone()),
            Json(request("Pets")),
        )
        .await
        .unwrap();

        let result =
            create_category_handler(State(service), Extension(user), Json(request("Pets"))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_create_validation_rejects_empty_name() {
        let service: Arc<dyn CategoryService> = Arc::new(StubCategoryService::new());
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
        };

        let result =
            create_category_handler(State(service), Extension(user), Json(request(""))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_deactivate_hides_category() {
        let service: Arc<dyn CategoryService> = Arc::new(StubCategoryService::new());
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
        };

        let (_, Json(created)) = create_category_handler(
            State(service.clone()),
            Extension(user.clone()),
            Json(request("Pets")),
        )
        .await
        .unwrap();

        let status = deactivate_category_handler(
            State(service.clone()),
            Extension(user.clone()),
            Path(created.id),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(listed) = list_categories_handler(State(service), Extension(user))
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_deactivate_unknown_category() {
        let service: Arc<dyn CategoryService> = Arc::new(StubCategoryService::new());
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
        };

        let result =
            deactivate_category_handler(State(service), Extension(user), Path(Uuid::new_v4()))
                .await;
        assert!(result.is_err());
    }
}
