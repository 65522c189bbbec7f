use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use arbor_types::api::{AddReplyRequest, PostEnvelope};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::views;

/// POST /post/{id}/reply — append a reply with a server-assigned timestamp.
/// Replying to an unknown post is a 404 and never creates anything.
pub async fn add_reply(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<AddReplyRequest>,
) -> Result<Json<PostEnvelope>, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("Content is required".into()));
    }

    let pid = post_id.to_string();
    if state.db.get_post(&pid)?.is_none() {
        return Err(ApiError::NotFound("Post not found".into()));
    }

    let reply_id = Uuid::new_v4();
    state
        .db
        .insert_reply(&reply_id.to_string(), &pid, &user.id.to_string(), &content)?;

    let post = views::load_post(&state, &pid)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    Ok(Json(PostEnvelope {
        success: true,
        post,
    }))
}
