pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::state::AppState;
use crate::uploads::MAX_BODY_BYTES;
use crate::{auth, boarding, candidates, notifications, offers, performance, training};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api/auth", auth_routes())
        .nest("/api/candidates", candidate_routes())
        .nest("/api/boarding", boarding_routes())
        .nest("/api/offers", offer_routes())
        .nest("/api/performance", performance_routes())
        .nest("/api/training", training_routes())
        .nest("/api/notifications", notification_routes())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use auth::handlers::*;
    Router::new()
        .route("/register", post(handle_register))
        .route("/login", post(handle_login))
        .route("/me", get(handle_me))
        .route("/logout", post(handle_logout))
        .route("/users/:id/reset-password", patch(handle_reset_password))
}

fn candidate_routes() -> Router<AppState> {
    use candidates::handlers::*;
    Router::new()
        .route(
            "/upload",
            post(handle_upload).layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .route("/batch", post(handle_batch_create))
        .route("/", get(handle_list))
        .route("/filters/colleges", get(handle_colleges))
        .route("/stats", get(handle_stats))
        .route(
            "/:id",
            get(handle_get).patch(handle_update).delete(handle_delete),
        )
        .route("/:id/resume", get(handle_resume))
        .route("/:id/rounds", post(handle_add_round))
        .route("/:id/rounds/:round_id", patch(handle_evaluate_round))
        .route("/:id/chat", post(handle_chat))
}

fn boarding_routes() -> Router<AppState> {
    use boarding::handlers::*;
    Router::new()
        .route("/enable", post(handle_enable))
        .route("/status", get(handle_status))
        .route(
            "/upload",
            post(handle_upload).layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .route("/verify/:document_id", patch(handle_verify))
        .route("/candidate/:candidate_id", get(handle_candidate_documents))
        .route("/file/:document_id", get(handle_file))
}

fn offer_routes() -> Router<AppState> {
    use offers::handlers::*;
    Router::new()
        .route("/preview", post(handle_preview))
        .route("/send", post(handle_send))
}

fn performance_routes() -> Router<AppState> {
    use performance::handlers::*;
    Router::new()
        .route("/start-internship", post(handle_start_internship))
        .route("/dashboard", get(handle_dashboard))
        .route("/review", post(handle_review))
        .route("/reviews/:candidate_id", get(handle_candidate_reviews))
        .route("/my-reviews", get(handle_my_reviews))
        .route("/sync-jira/:id", post(handle_sync_jira))
}

fn training_routes() -> Router<AppState> {
    use training::handlers::*;
    Router::new()
        .route("/assign", post(handle_assign))
        .route(
            "/upload-resource",
            post(handle_upload_resource).layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .route("/all", get(handle_all))
        .route("/candidate/:candidate_id", get(handle_for_candidate))
        .route("/my-learning", get(handle_my_learning))
        .route("/:id", delete(handle_delete))
        .route("/:id/complete", patch(handle_complete))
        .route("/:id/resources/:index", get(handle_resource_file))
}

fn notification_routes() -> Router<AppState> {
    use notifications::handlers::*;
    Router::new()
        .route("/", get(handle_list))
        .route("/custom", post(handle_custom))
        .route("/read-all", put(handle_read_all))
        .route("/:id", delete(handle_dismiss))
}
