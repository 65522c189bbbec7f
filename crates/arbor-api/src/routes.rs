use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;

use crate::auth::{self, AppState};
use crate::likes;
use crate::middleware::require_session;
use crate::posts;
use crate::replies;
use crate::storage;

/// Image ceiling plus slack for the other form fields and multipart framing.
const MAX_BODY_BYTES: usize = storage::MAX_IMAGE_BYTES + 64 * 1024;

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/check-session", get(auth::check_session))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/current-user", get(auth::current_user))
        .route("/posts", get(posts::list_posts))
        .route("/post", post(posts::create_post))
        .route("/posts/{id}", delete(posts::delete_post))
        .route("/post/{id}/reply", post(replies::add_reply))
        .route("/post/{id}/like", post(likes::like_post))
        .layer(from_fn_with_state(state.clone(), require_session))
        .with_state(state.clone());

    Router::new()
        .merge(public)
        .merge(protected)
        .nest_service("/uploads", ServeDir::new(state.storage.dir()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// GET /health — liveness check (no auth).
async fn health() -> &'static str {
    "ok"
}
