use std::sync::LazyLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use chrono::{Duration, Utc};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        session::Session,
        user::{SignUp, User},
    },
    state::AppState,
};

pub const SESSION_COOKIE: &str = "planner_session";

const SESSION_TTL_DAYS: i64 = 30;
const RESET_TOKEN_TTL_HOURS: i64 = 1;
const LOGIN_LINK_TTL_HOURS: i64 = 1;
const MIN_PASSWORD_LEN: usize = 8;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

const USER_COLUMNS: &str = "id, uuid, email, password_hash, created_at, last_login_at";

#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub uuid: String,
    pub email: String,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };
        Ok(Self(session_user(state, cookie.value()).await?))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

/// Resolves a session id to its user. Expired sessions are removed.
pub async fn session_user(
    state: &AppState,
    session_id: &str,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let session = sqlx::query_as::<_, Session>(
        "SELECT id, user_id, created_at, last_seen_at, expires_at FROM sessions WHERE id = ?1",
    )
    .bind(session_id)
    .fetch_optional(&state.db)
    .await?;
    let Some(session) = session else {
        return Ok(None);
    };

    let now = Utc::now();
    if session.is_expired(now) {
        destroy_session(state, &session.id).await?;
        return Ok(None);
    }

    sqlx::query("UPDATE sessions SET last_seen_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(&session.id)
        .execute(&state.db)
        .await?;

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
    ))
    .bind(session.user_id)
    .fetch_optional(&state.db)
    .await?;
    Ok(user.map(AuthenticatedUser::from))
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Other(anyhow::anyhow!("password hashing failed: {err}")))
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!("stored password hash is unreadable: {err}");
            false
        }
    }
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if !EMAIL.is_match(&email) {
        return Err(AppError::BadRequest("Enter a valid email address.".into()));
    }
    Ok(email)
}

async fn find_user_by_email(state: &AppState, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
    ))
    .bind(email)
    .fetch_optional(&state.db)
    .await?;
    Ok(user)
}

/// Creates the account and its profile together.
pub async fn register_user(state: &AppState, sign_up: &SignUp) -> Result<AuthenticatedUser, AppError> {
    let email = normalize_email(&sign_up.email)?;
    validate_password(&sign_up.password)?;
    if find_user_by_email(state, &email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered.".into()));
    }

    let password_hash = hash_password(&sign_up.password)?;
    let uuid = Uuid::new_v4().to_string();
    let now = Utc::now();

    let mut tx = state.db.begin().await?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (uuid, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING id",
    )
    .bind(&uuid)
    .bind(&email)
    .bind(&password_hash)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query(
        "INSERT INTO profiles (id, first_name, last_name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
    )
    .bind(&uuid)
    .bind(&sign_up.first_name)
    .bind(&sign_up.last_name)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(user = %uuid, "user registered");
    Ok(AuthenticatedUser { id, uuid, email })
}

pub async fn authenticate_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let email = email.trim().to_lowercase();
    let Some(user) = find_user_by_email(state, &email).await? else {
        return Err(AppError::Unauthorized);
    };
    if !verify_password(&user.password_hash, password) {
        return Err(AppError::Unauthorized);
    }
    sqlx::query("UPDATE users SET last_login_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(user.id)
        .execute(&state.db)
        .await?;
    Ok(user.into())
}

pub async fn create_session(state: &AppState, user_id: i64) -> Result<String, AppError> {
    let session_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO sessions (id, user_id, created_at, last_seen_at, expires_at) VALUES (?1, ?2, ?3, ?3, ?4)",
    )
    .bind(&session_id)
    .bind(user_id)
    .bind(now)
    .bind(now + Duration::days(SESSION_TTL_DAYS))
    .execute(&state.db)
    .await?;
    Ok(session_id)
}

pub async fn destroy_session(state: &AppState, session_id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE id = ?1")
        .bind(session_id)
        .execute(&state.db)
        .await?;
    Ok(())
}

pub fn apply_session_cookie(jar: PrivateCookieJar, session_id: &str) -> PrivateCookieJar {
    jar.add(
        Cookie::build((SESSION_COOKIE, session_id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Stores a hashed one-time token in `table` and logs the link carrying it.
async fn issue_link(
    state: &AppState,
    table: &str,
    path: &str,
    user: &User,
    ttl: Duration,
) -> Result<String, AppError> {
    let token = Uuid::new_v4().simple().to_string();
    let now = Utc::now();
    sqlx::query(&format!(
        "INSERT INTO {table} (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)"
    ))
    .bind(hash_token(&token))
    .bind(user.id)
    .bind(now)
    .bind(now + ttl)
    .execute(&state.db)
    .await?;

    let mut link = state
        .config
        .public_base_url
        .join(path)
        .map_err(|err| AppError::Other(err.into()))?;
    link.query_pairs_mut().append_pair("token", &token);
    info!(user = %user.uuid, %link, "{table} link issued");
    Ok(token)
}

/// Marks a live token as used and returns its user id.
async fn consume_link(
    conn: &mut SqliteConnection,
    table: &str,
    token: &str,
) -> Result<Option<i64>, AppError> {
    let user_id: Option<i64> = sqlx::query_scalar(&format!(
        "UPDATE {table} SET used_at = ?1 \
         WHERE token_hash = ?2 AND used_at IS NULL AND expires_at > ?1 \
         RETURNING user_id"
    ))
    .bind(Utc::now())
    .bind(hash_token(token))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user_id)
}

async fn known_user(state: &AppState, email: &str) -> Result<Option<User>, AppError> {
    let Ok(email) = normalize_email(email) else {
        return Ok(None);
    };
    let user = find_user_by_email(state, &email).await?;
    if user.is_none() {
        info!("one-time link requested for unknown email");
    }
    Ok(user)
}

/// Issues a one-time reset token for a known email. Delivery is out of band,
/// so the link is written to the log. Unknown emails yield `None`.
pub async fn request_password_reset(
    state: &AppState,
    email: &str,
) -> Result<Option<String>, AppError> {
    let Some(user) = known_user(state, email).await? else {
        return Ok(None);
    };
    let ttl = Duration::hours(RESET_TOKEN_TTL_HOURS);
    issue_link(state, "password_resets", "auth/reset-password", &user, ttl)
        .await
        .map(Some)
}

/// Consumes the token, sets the new password and drops every session of the user.
pub async fn complete_password_reset(
    state: &AppState,
    token: &str,
    new_password: &str,
) -> Result<(), AppError> {
    validate_password(new_password)?;

    let mut tx = state.db.begin().await?;
    let Some(user_id) = consume_link(&mut tx, "password_resets", token).await? else {
        return Err(AppError::BadRequest(
            "Reset link is invalid or has expired.".into(),
        ));
    };
    sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
        .bind(hash_password(new_password)?)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM sessions WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Passwordless sign-in: logs a one-time link to `auth/callback` for a known
/// email. Unknown emails yield `None`.
pub async fn request_login_link(
    state: &AppState,
    email: &str,
) -> Result<Option<String>, AppError> {
    let Some(user) = known_user(state, email).await? else {
        return Ok(None);
    };
    let ttl = Duration::hours(LOGIN_LINK_TTL_HOURS);
    issue_link(state, "login_links", "auth/callback", &user, ttl)
        .await
        .map(Some)
}

/// Consumes a sign-in link and returns its user with `last_login_at` stamped.
pub async fn complete_login_link(
    state: &AppState,
    token: &str,
) -> Result<AuthenticatedUser, AppError> {
    let mut tx = state.db.begin().await?;
    let Some(user_id) = consume_link(&mut tx, "login_links", token).await? else {
        return Err(AppError::BadRequest(
            "Sign-in link is invalid or has expired.".into(),
        ));
    };
    sqlx::query("UPDATE users SET last_login_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
    ))
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(user.into())
}

pub async fn update_password(
    state: &AppState,
    user: &AuthenticatedUser,
    new_password: &str,
) -> Result<(), AppError> {
    validate_password(new_password)?;
    sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
        .bind(hash_password(new_password)?)
        .bind(user.id)
        .execute(&state.db)
        .await?;
    info!(user = %user.uuid, "password updated");
    Ok(())
}
