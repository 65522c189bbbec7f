use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use rand::RngCore;
use tracing::info;
use uuid::Uuid;

use arbor_db::Database;
use arbor_types::api::{
    AckResponse, AuthResponse, CurrentUserResponse, LoginRequest, SessionStatus, SignupRequest,
};
use arbor_types::models::PublicUser;

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::storage::Storage;
use crate::views;

pub const SESSION_COOKIE: &str = "arbor_session";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub session_ttl_hours: i64,
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    if username.is_empty() || req.password.trim().is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".into(),
        ));
    }

    if state.db.get_user_by_username(&username)?.is_some() {
        return Err(ApiError::Conflict("Username already exists".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {e}"))?
        .to_string();

    let user_id = Uuid::new_v4();
    state
        .db
        .create_user(&user_id.to_string(), &username, &password_hash)?;

    let jar = establish_session(&state, jar, &user_id.to_string())?;
    info!("New user {} signed up", username);

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            success: true,
            user: PublicUser {
                id: user_id,
                username,
            },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_username(req.username.trim())?
        .ok_or(ApiError::InvalidCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("Stored hash unparseable for {}: {e}", user.id))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let jar = establish_session(&state, jar, &user.id)?;
    info!("User {} logged in", user.username);

    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            user: PublicUser {
                id: views::parse_uuid(&user.id, "user"),
                username: user.username,
            },
        }),
    ))
}

/// Destroys the session named by the cookie, if any. Calling this with no
/// active session still succeeds.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.db.delete_session(cookie.value())?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    Ok((jar, Json(AckResponse { success: true })))
}

pub async fn check_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<SessionStatus>, ApiError> {
    let session = match jar.get(SESSION_COOKIE) {
        Some(cookie) => state.db.get_session(cookie.value())?,
        None => None,
    };

    let status = match session {
        Some(s) => SessionStatus {
            authenticated: true,
            user: Some(PublicUser {
                id: views::parse_uuid(&s.user_id, "user"),
                username: s.username,
            }),
        },
        None => SessionStatus {
            authenticated: false,
            user: None,
        },
    };

    Ok(Json(status))
}

pub async fn current_user(
    Extension(user): Extension<CurrentUser>,
) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        username: user.username,
    })
}

fn establish_session(state: &AppState, jar: CookieJar, user_id: &str) -> Result<CookieJar, ApiError> {
    let token = new_session_token();
    state
        .db
        .create_session(&token, user_id, &format!("{} hours", state.session_ttl_hours))?;
    Ok(jar.add(session_cookie(token)))
}

/// 256-bit random token, URL-safe encoded. The browser holds only this opaque
/// value; identity and expiry live in the sessions table.
fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    B64.encode(bytes)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
