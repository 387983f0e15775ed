pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/api/health", get(handlers::health))

        // Auth routes (public)
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/send-password", post(handlers::auth::send_password))
        .route("/api/auth/forgot-password", post(handlers::auth::forgot_password))
        .route("/api/auth/me", get(handlers::auth::me))

        // Users (admin)
        .route("/api/users", get(handlers::users::list_users))

        // Expenses
        .route(
            "/api/expenses",
            get(handlers::expenses::list_expenses).post(handlers::expenses::create_expense),
        )
        .route("/api/expenses/count", get(handlers::expenses::expense_count))
        .route("/api/expenses/events", get(handlers::events::review_events))
        .route("/api/expenses/status/:status", get(handlers::expenses::list_expenses_by_status))
        .route("/api/expenses/:id", axum::routing::delete(handlers::expenses::delete_expense))
        .route("/api/expenses/:id/status", put(handlers::expenses::update_status))
        .route("/api/expenses/:id/reviews", get(handlers::expenses::review_history))

        // Receipt parsing
        .route("/api/parse-receipt", post(handlers::receipts::start_parse))
        .route("/api/parse-receipt/:job_id", get(handlers::receipts::parse_status))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(cors)
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}
