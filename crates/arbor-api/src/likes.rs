use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::debug;
use uuid::Uuid;

use arbor_types::api::PostEnvelope;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::views;

/// POST /post/{id}/like — toggle the requester's membership in the post's
/// like set. Liking twice removes the like, so a user never counts double.
pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<PostEnvelope>, ApiError> {
    let pid = post_id.to_string();
    if state.db.get_post(&pid)?.is_none() {
        return Err(ApiError::NotFound("Post not found".into()));
    }

    let added = state.db.toggle_like(&pid, &user.id.to_string())?;
    debug!(
        "User {} {} post {}",
        user.username,
        if added { "liked" } else { "unliked" },
        pid
    );

    let post = views::load_post(&state, &pid)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    Ok(Json(PostEnvelope {
        success: true,
        post,
    }))
}
