pub mod health;
pub mod sessions;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Survey sessions: one per hosting-page visit
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(sessions::handle_get_session).delete(sessions::handle_delete_session),
        )
        .route("/api/v1/sessions/:id/answer", post(sessions::handle_answer))
        .route("/api/v1/sessions/:id/image", post(sessions::handle_select_image))
        .route("/api/v1/sessions/:id/advance", post(sessions::handle_advance))
        .route("/api/v1/sessions/:id/retreat", post(sessions::handle_retreat))
        .route("/api/v1/sessions/:id/submit", post(sessions::handle_retry_submit))
        .with_state(state)
}
