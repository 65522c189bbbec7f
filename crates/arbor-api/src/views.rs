//! Row-to-response assembly: resolves author usernames, groups replies and
//! likes onto their posts, and tolerates corrupt rows without failing the
//! whole request.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use arbor_db::models::{LikeRow, PostRow, ReplyRow};
use arbor_types::api::{PostView, ReplyView};
use arbor_types::models::PublicUser;

use crate::auth::AppState;

pub(crate) fn parse_uuid(raw: &str, ctx: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", ctx, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str, ctx: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on {}: {}", raw, ctx, e);
            DateTime::default()
        })
}

pub(crate) fn assemble_post(post: PostRow, replies: Vec<ReplyRow>, likes: &[LikeRow]) -> PostView {
    let replies: Vec<ReplyView> = replies
        .into_iter()
        .map(|r| ReplyView {
            id: parse_uuid(&r.id, "reply"),
            author: PublicUser {
                id: parse_uuid(&r.author_id, "reply author"),
                username: r.author_username,
            },
            created_at: parse_timestamp(&r.created_at, "reply"),
            content: r.content,
        })
        .collect();

    let likes: Vec<Uuid> = likes.iter().map(|l| parse_uuid(&l.user_id, "like user")).collect();

    PostView {
        id: parse_uuid(&post.id, "post"),
        author: PublicUser {
            id: parse_uuid(&post.author_id, "post author"),
            username: post.author_username,
        },
        created_at: parse_timestamp(&post.created_at, "post"),
        title: post.title,
        content: post.content,
        image: post.image,
        like_count: likes.len(),
        likes,
        replies,
    }
}

/// One post with replies and likes resolved, or None if it does not exist.
pub(crate) fn load_post(state: &AppState, post_id: &str) -> Result<Option<PostView>> {
    let Some(post) = state.db.get_post(post_id)? else {
        return Ok(None);
    };

    let ids = vec![post.id.clone()];
    let replies = state.db.get_replies_for_posts(&ids)?;
    let likes = state.db.get_likes_for_posts(&ids)?;

    Ok(Some(assemble_post(post, replies, &likes)))
}
