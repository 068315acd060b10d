use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::expense::{CreateExpenseRequest, Expense, ExpenseSource};
use crate::models::reports::DashboardStats;
use crate::services::expense_service::{ExpenseError, ExpenseService};

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

/// Convert ExpenseError to HTTP response
impl IntoResponse for ExpenseError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ExpenseError::InvalidAmount => (
                StatusCode::BAD_REQUEST,
                "invalid_amount",
                "Amount must be positive",
            ),
            ExpenseError::CategoryNotFound => (
                StatusCode::NOT_FOUND,
                "category_not_found",
                "Category not found",
            ),
            ExpenseError::EntryNotFound => (
                StatusCode::NOT_FOUND,
                "entry_not_found",
                "Expense not found",
            ),
            ExpenseError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "unauthorized",
                "Unauthorized to access this entry",
            ),
            ExpenseError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.as_str(),
            ),
        };

        let error_response = ErrorResponse::new(error_type, message);
        (status, Json(error_response)).into_response()
    }
}

/// Handler for creating an expense from the web dashboard
#[utoipa::path(
    post,
    path = "/api/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = Expense),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn create_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), Response> {
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

    match expense_service
        .create_expense(auth_user.user_id, request, ExpenseSource::Web)
        .await
    {
        Ok(expense) => Ok((StatusCode::CREATED, Json(expense))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for listing recent expenses
#[utoipa::path(
    get,
    path = "/api/expenses",
    responses(
        (status = 200, description = "Recent expenses, newest first", body = Vec<Expense>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn list_expenses_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Expense>>, Response> {
    match expense_service.list_recent(auth_user.user_id).await {
        Ok(expenses) => Ok(Json(expenses)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for soft-deleting an expense
#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    params(
        ("id" = Uuid, Path, description = "Expense ID")
    ),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 403, description = "User doesn't own the entry", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn delete_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, Response> {
    match expense_service
        .delete_expense(auth_user.user_id, expense_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for irreversibly purging an expense (administrative use)
#[utoipa::path(
    delete,
    path = "/api/expenses/{id}/purge",
    params(
        ("id" = Uuid, Path, description = "Expense ID")
    ),
    responses(
        (status = 204, description = "Expense permanently removed"),
        (status = 403, description = "User doesn't own the entry", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn purge_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, Response> {
    match expense_service
        .purge_expense(auth_user.user_id, expense_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for the dashboard headline figures
#[utoipa::path(
    get,
    path = "/api/expenses/stats",
    responses(
        (status = 200, description = "Today / week / month totals and category breakdown", body = DashboardStats),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn expense_stats_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<DashboardStats>, Response> {
    let today = Utc::now().date_naive();
    match expense_service
        .dashboard_stats(auth_user.user_id, today)
        .await
    {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => Err(e.into_response()),
    }
}
