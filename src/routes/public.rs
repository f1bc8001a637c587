use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    auth::{self, AuthenticatedUser, CurrentUser},
    error::AppError,
    models::{
        dashboard::DashboardData,
        user::{SignIn, SignUp},
    },
    services::dashboard,
    state::AppState,
};

use super::parse_date;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/itineraries/dates", get(itinerary_dates))
        .route("/api/itineraries/:date", get(itinerary_file))
        .route("/api/dashboard", get(file_dashboard))
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
        .route("/auth/session", get(session))
        .route("/auth/reset-password", post(reset_request))
        .route("/auth/reset-password/confirm", post(reset_confirm))
        .route("/auth/magic-link", post(login_link_request))
        .route("/auth/magic-link/confirm", post(login_link_confirm))
}

async fn itinerary_dates(State(state): State<AppState>) -> Json<Vec<NaiveDate>> {
    Json(state.files.available_dates().await)
}

async fn itinerary_file(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    state
        .files
        .load_raw(date)
        .await
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn file_dashboard(State(state): State<AppState>) -> Json<DashboardData> {
    let today = Utc::now().date_naive();
    Json(dashboard::load_dashboard(&state.files, state.config.travelers, today).await)
}

async fn sign_up(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(form): Json<SignUp>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth::register_user(&state, &form).await?;
    let session_id = auth::create_session(&state, user.id).await?;
    Ok((
        StatusCode::CREATED,
        auth::apply_session_cookie(jar, &session_id),
        Json(user),
    ))
}

async fn sign_in(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(form): Json<SignIn>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth::authenticate_user(&state, &form.email, &form.password).await?;
    let session_id = auth::create_session(&state, user.id).await?;
    Ok((auth::apply_session_cookie(jar, &session_id), Json(user)))
}

async fn sign_out(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, StatusCode), AppError> {
    if let Some(cookie) = jar.get(auth::SESSION_COOKIE) {
        auth::destroy_session(&state, cookie.value()).await?;
    }
    Ok((auth::clear_session_cookie(jar), StatusCode::NO_CONTENT))
}

async fn session(current: CurrentUser) -> Result<Json<AuthenticatedUser>, AppError> {
    Ok(Json(current.require_user()?.clone()))
}

#[derive(Deserialize)]
struct EmailForm {
    email: String,
}

async fn reset_request(
    State(state): State<AppState>,
    Json(form): Json<EmailForm>,
) -> Result<StatusCode, AppError> {
    auth::request_password_reset(&state, &form.email).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
struct ResetConfirm {
    token: String,
    password: String,
}

async fn reset_confirm(
    State(state): State<AppState>,
    Json(form): Json<ResetConfirm>,
) -> Result<StatusCode, AppError> {
    auth::complete_password_reset(&state, &form.token, &form.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn login_link_request(
    State(state): State<AppState>,
    Json(form): Json<EmailForm>,
) -> Result<StatusCode, AppError> {
    auth::request_login_link(&state, &form.email).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
struct TokenForm {
    token: String,
}

async fn login_link_confirm(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(form): Json<TokenForm>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth::complete_login_link(&state, &form.token).await?;
    let session_id = auth::create_session(&state, user.id).await?;
    Ok((auth::apply_session_cookie(jar, &session_id), Json(user)))
}
