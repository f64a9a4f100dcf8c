pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::prep::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Model backends and contracts
        .route("/api/v1/providers", get(handlers::handle_list_providers))
        .route("/api/v1/contracts", get(handlers::handle_list_contracts))
        .route("/api/v1/normalize", post(handlers::handle_normalize))
        // Interview prep
        .route(
            "/api/v1/analyses/compatibility",
            post(handlers::handle_compatibility),
        )
        .route(
            "/api/v1/questions/generate",
            post(handlers::handle_generate_questions),
        )
        .route(
            "/api/v1/practice/evaluate",
            post(handlers::handle_evaluate_practice),
        )
        // Coaching and documents
        .route("/api/v1/coach/advice", post(handlers::handle_coach_advice))
        .route(
            "/api/v1/coach/quick-advice",
            post(handlers::handle_quick_advice),
        )
        .route(
            "/api/v1/documents/generate",
            post(handlers::handle_generate_document),
        )
        .with_state(state)
}
