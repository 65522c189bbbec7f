use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::auth::{AppState, SESSION_COOKIE};
use crate::error::ApiError;

/// Identity resolved by the session gate, available to protected handlers
/// as a request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

/// Session gate for protected routes.
///
/// Requires a session cookie naming a live (non-expired) session row; the
/// session's user is attached to the request. Anything else short-circuits
/// with 401 before the handler runs.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let jar = CookieJar::from_headers(req.headers());
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::Session)?;

    let session = state.db.get_session(&token)?.ok_or(ApiError::Session)?;

    let id: Uuid = session
        .user_id
        .parse()
        .map_err(|e| anyhow::anyhow!("Corrupt user id '{}' on session: {e}", session.user_id))?;

    req.extensions_mut().insert(CurrentUser {
        id,
        username: session.username,
    });

    Ok(next.run(req).await)
}
