/// Database row types — these map directly to SQLite rows.
/// Distinct from arbor-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

/// Session row joined with its user so the gate resolves identity in one query.
pub struct SessionRow {
    pub token: String,
    pub user_id: String,
    pub username: String,
    pub expires_at: String,
}

pub struct PostRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_username: String,
    pub image: Option<String>,
    pub created_at: String,
}

pub struct ReplyRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub created_at: String,
}

pub struct LikeRow {
    pub post_id: String,
    pub user_id: String,
}
