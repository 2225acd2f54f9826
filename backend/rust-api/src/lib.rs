use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod engine;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // The test window is served from another origin in development.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .merge(sessions_routes())
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn sessions_routes() -> Router<Arc<AppState>> {
    use handlers::{sessions, sse};

    Router::new()
        .route("/api/v1/sessions", post(sessions::create_session))
        .route(
            "/api/v1/sessions/{id}",
            get(sessions::get_session).delete(sessions::teardown_session),
        )
        .route("/api/v1/sessions/{id}/answer", post(sessions::select_option))
        .route("/api/v1/sessions/{id}/save", post(sessions::save_answer))
        .route("/api/v1/sessions/{id}/next", post(sessions::next_question))
        .route(
            "/api/v1/sessions/{id}/save-and-next",
            post(sessions::save_and_next),
        )
        .route(
            "/api/v1/sessions/{id}/previous",
            post(sessions::previous_question),
        )
        .route("/api/v1/sessions/{id}/flag", post(sessions::toggle_flag))
        .route("/api/v1/sessions/{id}/jump", post(sessions::jump_to_question))
        .route(
            "/api/v1/sessions/{id}/sections/{index}",
            post(sessions::jump_to_section),
        )
        .route("/api/v1/sessions/{id}/submit", post(sessions::submit_test))
        .route("/api/v1/sessions/{id}/report", get(sessions::get_report))
        .route("/api/v1/sessions/{id}/stream", get(sse::session_stream))
}
