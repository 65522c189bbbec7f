use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PublicUser;

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: PublicUser,
}

/// Bare acknowledgement for logout and delete.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub username: String,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddReplyRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ReplyView {
    pub id: Uuid,
    pub content: String,
    pub author: PublicUser,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub author: PublicUser,
    /// Like set: one entry per user, toggled on repeat likes.
    pub likes: Vec<Uuid>,
    pub like_count: usize,
    pub replies: Vec<ReplyView>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PostEnvelope {
    pub success: bool,
    pub post: PostView,
}
