use axum::{
    extract::FromRef,
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::prelude::*;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use expense_tracker::bot::BotOrchestrator;
use expense_tracker::config::{Config, MessageProvider};
use expense_tracker::handlers::auth_handlers::{
    link_whatsapp_handler, login_handler, register_handler, verify_whatsapp_handler, ErrorResponse,
};
use expense_tracker::handlers::category_handlers::{
    create_category_handler, deactivate_category_handler, list_categories_handler,
};
use expense_tracker::handlers::expense_handlers::{
    create_expense_handler, delete_expense_handler, expense_stats_handler, list_expenses_handler,
    purge_expense_handler,
};
use expense_tracker::handlers::webhook_handlers::{
    receive_webhook_handler, send_reminder_handler, verify_webhook_handler, ReminderConfig,
    WebhookConfig,
};
use expense_tracker::middleware::auth_middleware::auth_middleware;
use expense_tracker::models::auth::{AuthToken, LoginRequest};
use expense_tracker::models::category::{Category, CreateCategoryRequest};
use expense_tracker::models::expense::{CreateExpenseRequest, Expense};
use expense_tracker::models::reports::{CategoryTotal, DashboardStats};
use expense_tracker::models::user::{
    CreateUserRequest, LinkWhatsAppRequest, User, VerifyOtpRequest,
};
use expense_tracker::repositories::category_repository::{
    CategoryRepository, PostgresCategoryRepository,
};
use expense_tracker::repositories::expense_repository::{
    ExpenseRepository, PostgresExpenseRepository,
};
use expense_tracker::repositories::mapping_repository::{
    MappingRepository, PostgresMappingRepository,
};
use expense_tracker::repositories::otp_repository::PostgresOtpRepository;
use expense_tracker::repositories::user_repository::{PostgresUserRepository, UserRepository};
use expense_tracker::services::auth_service::{AuthService, AuthServiceImpl};
use expense_tracker::services::category_service::{CategoryService, CategoryServiceImpl};
use expense_tracker::services::expense_service::{ExpenseService, ExpenseServiceImpl};
use expense_tracker::services::otp_service::{OtpService, OtpServiceImpl, SystemClock};
use expense_tracker::services::statement_service::StatementService;
use expense_tracker::transport::{ChatTransport, MetaCloudTransport, TwilioTransport};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        expense_tracker::handlers::auth_handlers::register_handler,
        expense_tracker::handlers::auth_handlers::login_handler,
        expense_tracker::handlers::auth_handlers::link_whatsapp_handler,
        expense_tracker::handlers::auth_handlers::verify_whatsapp_handler,
        expense_tracker::handlers::category_handlers::list_categories_handler,
        expense_tracker::handlers::category_handlers::create_category_handler,
        expense_tracker::handlers::category_handlers::deactivate_category_handler,
        expense_tracker::handlers::expense_handlers::create_expense_handler,
        expense_tracker::handlers::expense_handlers::list_expenses_handler,
        expense_tracker::handlers::expense_handlers::delete_expense_handler,
        expense_tracker::handlers::expense_handlers::purge_expense_handler,
        expense_tracker::handlers::expense_handlers::expense_stats_handler,
    ),
    components(
        schemas(
            User, CreateUserRequest, LinkWhatsAppRequest, VerifyOtpRequest,
            LoginRequest, AuthToken,
            Category, CreateCategoryRequest,
            Expense, CreateExpenseRequest,
            DashboardStats, CategoryTotal,
            ErrorResponse
        )
    ),
    tags(
        (name = "auth", description = "Authentication and WhatsApp linking"),
        (name = "categories", description = "Category management"),
        (name = "expenses", description = "Expense management")
    ),
    info(
        title = "Expense Tracker API",
        version = "0.1.0",
        description = "Personal expense tracker with a WhatsApp chat interface",
    )
)]
struct ApiDoc;

/// Shared application state; handlers pull the slice they need via FromRef
#[derive(Clone, FromRef)]
struct AppState {
    auth_service: Arc<dyn AuthService>,
    category_service: Arc<dyn CategoryService>,
    expense_service: Arc<dyn ExpenseService>,
    user_repository: Arc<dyn UserRepository>,
    orchestrator: Arc<BotOrchestrator>,
    transport: Arc<dyn ChatTransport>,
    webhook_config: Arc<WebhookConfig>,
    reminder_config: Arc<ReminderConfig>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    info!("connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("migrations completed");

    // Initialize repositories
    let user_repository: Arc<dyn UserRepository> =
        Arc::new(PostgresUserRepository::new(pool.clone()));
    let category_repository: Arc<dyn CategoryRepository> =
        Arc::new(PostgresCategoryRepository::new(pool.clone()));
    let expense_repository: Arc<dyn ExpenseRepository> =
        Arc::new(PostgresExpenseRepository::new(pool.clone()));
    let mapping_repository: Arc<dyn MappingRepository> =
        Arc::new(PostgresMappingRepository::new(pool.clone()));
    let otp_repository = Arc::new(PostgresOtpRepository::new(pool.clone()));

    // Outbound transport, selected by configuration
    let transport: Arc<dyn ChatTransport> = match config.provider {
        MessageProvider::MetaCloud => Arc::new(MetaCloudTransport::new(
            config.meta_access_token.clone(),
            config.meta_phone_number_id.clone(),
            config.default_country_code.clone(),
        )),
        MessageProvider::Twilio => Arc::new(TwilioTransport::new(
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_whatsapp_number.clone(),
        )),
    };

    // Initialize services
    let category_service: Arc<dyn CategoryService> =
        Arc::new(CategoryServiceImpl::new(category_repository.clone()));
    let otp_service: Arc<dyn OtpService> = Arc::new(OtpServiceImpl::new(
        otp_repository,
        user_repository.clone(),
        Arc::new(SystemClock),
    ));
    let auth_service: Arc<dyn AuthService> = Arc::new(AuthServiceImpl::new(
        user_repository.clone(),
        category_service.clone(),
        otp_service,
        mapping_repository.clone(),
        transport.clone(),
        config.jwt_secret.clone(),
    ));
    let expense_service: Arc<dyn ExpenseService> = Arc::new(ExpenseServiceImpl::new(
        expense_repository.clone(),
        category_repository.clone(),
    ));
    let statement_service = Arc::new(StatementService::new(
        expense_repository.clone(),
        category_repository.clone(),
    ));

    let orchestrator = Arc::new(BotOrchestrator::new(
        user_repository.clone(),
        mapping_repository,
        category_repository,
        expense_repository,
        statement_service,
        transport.clone(),
    ));

    let webhook_config = Arc::new(WebhookConfig {
        verify_token: config.webhook_verify_token.clone(),
        app_secret: config.webhook_app_secret.clone(),
        verify_signatures: config.verify_webhook_signatures,
    });
    let reminder_config = Arc::new(ReminderConfig {
        template: config.reminder_template.clone(),
    });

    let state = AppState {
        auth_service: auth_service.clone(),
        category_service,
        expense_service,
        user_repository,
        orchestrator,
        transport,
        webhook_config,
        reminder_config,
    };

    // Routes behind JWT auth
    let protected = Router::new()
        .route("/api/auth/whatsapp/link", post(link_whatsapp_handler))
        .route("/api/auth/whatsapp/verify", post(verify_whatsapp_handler))
        .route(
            "/api/categories",
            get(list_categories_handler).post(create_category_handler),
        )
        .route("/api/categories/{id}", delete(deactivate_category_handler))
        .route(
            "/api/expenses",
            get(list_expenses_handler).post(create_expense_handler),
        )
        .route("/api/expenses/stats", get(expense_stats_handler))
        .route("/api/expenses/{id}", delete(delete_expense_handler))
        .route("/api/expenses/{id}/purge", delete(purge_expense_handler))
        .route("/api/whatsapp/reminder", post(send_reminder_handler))
        .route_layer(middleware::from_fn_with_state(
            auth_service,
            auth_middleware,
        ));

    // Build router with routes
    let app = Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Authentication routes
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        // WhatsApp webhook (verification handshake + inbound events)
        .route(
            "/api/whatsapp/webhook",
            get(verify_webhook_handler).post(receive_webhook_handler),
        )
        .merge(protected)
        .with_state(state)
        // Merge Swagger UI
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        // Add CORS middleware
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("server running on http://{addr}");
    info!("  - health check: http://{addr}/health");
    info!("  - webhook: http://{addr}/api/whatsapp/webhook");
    info!("  - API docs: http://{addr}/api/docs");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
