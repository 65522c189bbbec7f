use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};
use uuid::Uuid;

use arbor_types::api::{AckResponse, PostEnvelope, PostView};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::storage::{self, Storage};
use crate::views;

/// POST /post — multipart form: `title`, `content`, optional `image` file.
///
/// The image is validated (extension, MIME type, size ceiling) and written to
/// disk before the post row is inserted; a rejected upload therefore never
/// leaves a post behind, and a failed insert cleans the image back up.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut title = String::new();
    let mut content = String::new();
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = field.text().await.map_err(bad_multipart)?,
            "content" => content = field.text().await.map_err(bad_multipart)?,
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if filename.is_empty() {
                    // Empty file input on the form; treat as no image.
                    continue;
                }

                let ext = storage::allowed_extension(&filename).ok_or_else(|| {
                    ApiError::Validation(
                        "Only jpg, jpeg, png and gif images are accepted".into(),
                    )
                })?;

                if let Some(content_type) = field.content_type() {
                    if !storage::ALLOWED_MIME_TYPES.contains(&content_type) {
                        return Err(ApiError::Validation(
                            "Only jpg, jpeg, png and gif images are accepted".into(),
                        ));
                    }
                }

                let data = field.bytes().await.map_err(bad_multipart)?;
                if data.len() > storage::MAX_IMAGE_BYTES {
                    return Err(ApiError::Validation("Image exceeds the 5 MiB limit".into()));
                }

                image = Some((ext, data.to_vec()));
            }
            _ => {}
        }
    }

    let title = title.trim().to_string();
    let content = content.trim().to_string();
    if title.is_empty() || content.is_empty() {
        return Err(ApiError::Validation("Title and content are required".into()));
    }

    let image_url = match &image {
        Some((ext, data)) => {
            let name = format!("{}.{}", Uuid::new_v4(), ext);
            state.storage.save_image(&name, data).await?;
            Some(Storage::public_url(&name))
        }
        None => None,
    };

    let post_id = Uuid::new_v4();
    if let Err(e) = state.db.insert_post(
        &post_id.to_string(),
        &title,
        &content,
        &user.id.to_string(),
        image_url.as_deref(),
    ) {
        // Don't leave an orphaned image on disk.
        if let Some(url) = &image_url {
            if let Some(name) = Storage::local_name(url) {
                state.storage.delete_image(name).await.ok();
            }
        }
        return Err(e.into());
    }

    info!("Post {} created by {}", post_id, user.username);

    let post = views::load_post(&state, &post_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("Post {} vanished after insert", post_id))?;

    Ok((
        StatusCode::CREATED,
        Json(PostEnvelope {
            success: true,
            post,
        }),
    ))
}

/// GET /posts — all posts, newest first, authors and reply authors resolved.
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> Result<Json<Vec<PostView>>, ApiError> {
    // Run blocking DB queries off the async runtime
    let db = state.clone();
    let (posts, replies, likes) = tokio::task::spawn_blocking(move || {
        let posts = db.db.get_posts()?;
        let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
        let replies = db.db.get_replies_for_posts(&ids)?;
        let likes = db.db.get_likes_for_posts(&ids)?;
        Ok::<_, anyhow::Error>((posts, replies, likes))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        anyhow::anyhow!("join error: {e}")
    })??;

    // Group replies and likes by post id (cheap in-memory work)
    let mut reply_map: HashMap<String, Vec<_>> = HashMap::new();
    for reply in replies {
        reply_map.entry(reply.post_id.clone()).or_default().push(reply);
    }
    let mut like_map: HashMap<String, Vec<_>> = HashMap::new();
    for like in likes {
        like_map.entry(like.post_id.clone()).or_default().push(like);
    }

    let views: Vec<PostView> = posts
        .into_iter()
        .map(|post| {
            let replies = reply_map.remove(&post.id).unwrap_or_default();
            let likes = like_map.remove(&post.id).unwrap_or_default();
            views::assemble_post(post, replies, &likes)
        })
        .collect();

    Ok(Json(views))
}

/// DELETE /posts/{id} — author only. A locally stored image goes with the
/// post; third-party image URLs are left alone.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<AckResponse>, ApiError> {
    let pid = post_id.to_string();

    let post = state
        .db
        .get_post(&pid)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    if post.author_id != user.id.to_string() {
        return Err(ApiError::Forbidden(
            "Only the author can delete a post".into(),
        ));
    }

    state.db.delete_post(&pid)?;

    if let Some(url) = &post.image {
        if let Some(name) = Storage::local_name(url) {
            state.storage.delete_image(name).await.ok();
        }
    }

    info!("Post {} deleted by {}", pid, user.username);
    Ok(Json(AckResponse { success: true }))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation(format!("Malformed form data: {e}"))
}
