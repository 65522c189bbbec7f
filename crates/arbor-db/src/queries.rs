use crate::Database;
use crate::models::{LikeRow, PostRow, ReplyRow, SessionRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Sessions --

    /// `ttl` is a SQLite datetime modifier such as "24 hours"; negative values
    /// are only useful for tests.
    pub fn create_session(&self, token: &str, user_id: &str, ttl: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, expires_at)
                 VALUES (?1, ?2, datetime('now', ?3))",
                (token, user_id, ttl),
            )?;
            Ok(())
        })
    }

    /// Look up a live session and resolve its user in one query.
    /// Expired sessions are invisible here even before the sweep removes them.
    pub fn get_session(&self, token: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.token, s.user_id, u.username, s.expires_at
                 FROM sessions s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            )?;

            let row = stmt
                .query_row([token], |row| {
                    Ok(SessionRow {
                        token: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        expires_at: row.get(3)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    /// Deleting a token that does not exist is a no-op, which makes logout
    /// idempotent at the store level.
    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
            Ok(())
        })
    }

    pub fn delete_expired_sessions(&self) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM sessions WHERE expires_at <= datetime('now')",
                [],
            )?;
            Ok(n)
        })
    }

    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        title: &str,
        content: &str,
        author_id: &str,
        image: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, title, content, author_id, image)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, title, content, author_id, image],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{POST_SELECT} WHERE p.id = ?1"))?;
            let row = stmt.query_row([id], map_post_row).optional()?;
            Ok(row)
        })
    }

    /// All posts, newest first. The rowid tiebreak keeps ordering stable for
    /// posts created within the same second.
    pub fn get_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{POST_SELECT} ORDER BY p.created_at DESC, p.rowid DESC"))?;
            let rows = stmt
                .query_map([], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Removes the post row; replies and likes go with it via CASCADE.
    pub fn delete_post(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Replies --

    pub fn insert_reply(&self, id: &str, post_id: &str, author_id: &str, content: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO replies (id, post_id, author_id, content) VALUES (?1, ?2, ?3, ?4)",
                (id, post_id, author_id, content),
            )?;
            Ok(())
        })
    }

    /// Batch-fetch replies for a set of post IDs, insertion order preserved.
    pub fn get_replies_for_posts(&self, post_ids: &[String]) -> Result<Vec<ReplyRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT r.id, r.post_id, r.author_id, u.username, r.content, r.created_at
                 FROM replies r
                 LEFT JOIN users u ON r.author_id = u.id
                 WHERE r.post_id IN ({})
                 ORDER BY r.created_at ASC, r.rowid ASC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(ReplyRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        author_id: row.get(2)?,
                        author_username: row
                            .get::<_, Option<String>>(3)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        content: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Likes --

    /// Toggle a like: removes if present, inserts if not.
    /// Returns true when the like was added, false when removed.
    pub fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT post_id FROM likes WHERE post_id = ?1 AND user_id = ?2",
                    (post_id, user_id),
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some() {
                conn.execute(
                    "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
                    (post_id, user_id),
                )?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO likes (post_id, user_id) VALUES (?1, ?2)",
                    (post_id, user_id),
                )?;
                Ok(true)
            }
        })
    }

    /// Batch-fetch likes for a set of post IDs.
    pub fn get_likes_for_posts(&self, post_ids: &[String]) -> Result<Vec<LikeRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT post_id, user_id FROM likes WHERE post_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(LikeRow {
                        post_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

const POST_SELECT: &str = "SELECT p.id, p.title, p.content, p.author_id, u.username, p.image, p.created_at
     FROM posts p
     LEFT JOIN users u ON p.author_id = u.id";

fn map_post_row(row: &rusqlite::Row<'_>) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| "unknown".to_string()),
        image: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, password, created_at FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db_with_user(id: &str, username: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user(id, username, "hash").unwrap();
        db
    }

    #[test]
    fn username_uniqueness_is_enforced() {
        let db = db_with_user("u1", "alice");
        assert!(db.create_user("u2", "alice", "other-hash").is_err());
        assert!(db.get_user_by_username("alice").unwrap().is_some());
        assert!(db.get_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn posts_come_back_newest_first() {
        let db = db_with_user("u1", "alice");
        db.insert_post("p1", "first", "body", "u1", None).unwrap();
        db.insert_post("p2", "second", "body", "u1", None).unwrap();
        db.insert_post("p3", "third", "body", "u1", None).unwrap();

        let titles: Vec<String> = db.get_posts().unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[test]
    fn replies_preserve_insertion_order() {
        let db = db_with_user("u1", "alice");
        db.insert_post("p1", "t", "c", "u1", None).unwrap();
        db.insert_reply("r1", "p1", "u1", "one").unwrap();
        db.insert_reply("r2", "p1", "u1", "two").unwrap();
        db.insert_reply("r3", "p1", "u1", "three").unwrap();

        let replies = db.get_replies_for_posts(&["p1".to_string()]).unwrap();
        let contents: Vec<String> = replies.into_iter().map(|r| r.content).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn reply_requires_existing_post() {
        let db = db_with_user("u1", "alice");
        assert!(db.insert_reply("r1", "missing", "u1", "hi").is_err());
    }

    #[test]
    fn like_toggles_per_user() {
        let db = db_with_user("u1", "alice");
        db.create_user("u2", "bob", "hash").unwrap();
        db.insert_post("p1", "t", "c", "u1", None).unwrap();

        assert!(db.toggle_like("p1", "u2").unwrap());
        assert_eq!(db.get_likes_for_posts(&["p1".to_string()]).unwrap().len(), 1);

        // Second like from the same user removes it — never double-counts.
        assert!(!db.toggle_like("p1", "u2").unwrap());
        assert!(db.get_likes_for_posts(&["p1".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn deleting_a_post_cascades_to_replies_and_likes() {
        let db = db_with_user("u1", "alice");
        db.insert_post("p1", "t", "c", "u1", None).unwrap();
        db.insert_reply("r1", "p1", "u1", "hi").unwrap();
        db.toggle_like("p1", "u1").unwrap();

        db.delete_post("p1").unwrap();
        assert!(db.get_post("p1").unwrap().is_none());
        assert!(db.get_replies_for_posts(&["p1".to_string()]).unwrap().is_empty());
        assert!(db.get_likes_for_posts(&["p1".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn expired_sessions_are_invisible_and_swept() {
        let db = db_with_user("u1", "alice");
        db.create_session("live", "u1", "24 hours").unwrap();
        db.create_session("stale", "u1", "-1 hours").unwrap();

        assert!(db.get_session("live").unwrap().is_some());
        assert!(db.get_session("stale").unwrap().is_none());

        assert_eq!(db.delete_expired_sessions().unwrap(), 1);
        assert!(db.get_session("live").unwrap().is_some());
    }

    #[test]
    fn session_resolves_its_user() {
        let db = db_with_user("u1", "alice");
        db.create_session("tok", "u1", "24 hours").unwrap();

        let session = db.get_session("tok").unwrap().unwrap();
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.username, "alice");

        db.delete_session("tok").unwrap();
        assert!(db.get_session("tok").unwrap().is_none());
        // Idempotent delete
        db.delete_session("tok").unwrap();
    }
}
