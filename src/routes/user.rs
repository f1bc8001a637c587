use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    models::{
        activity::ActivityStatus,
        itinerary::DayProgram,
        profile::{Profile, ProfileUpdate},
        sync::{OfflineData, SyncQueueItem, SyncReport},
    },
    services::{
        import::{self, MigrationOptions, MigrationReport},
        profiles,
        sync::DbSyncTarget,
    },
    state::AppState,
};

use super::parse_date;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/password", post(change_password))
        .route("/profile", get(profile).put(profile_update))
        .route("/avatar", put(avatar_upload))
        .route("/import", post(import_files))
        .route("/offline", get(offline_store))
        .route(
            "/offline/itineraries/:date",
            get(offline_itinerary).put(offline_save),
        )
        .route("/offline/dates", get(offline_dates))
        .route("/offline/activities/:id/status", patch(offline_status))
        .route("/sync/queue", get(sync_queue))
        .route("/sync", post(sync_now))
}

#[derive(Deserialize)]
struct PasswordForm {
    password: String,
}

async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(form): Json<PasswordForm>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    auth::update_password(&state, user, &form.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Profile>, AppError> {
    let user = current.require_user()?;
    Ok(Json(profiles::get_profile(&state.db, &user.uuid).await?))
}

async fn profile_update(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, AppError> {
    let user = current.require_user()?;
    Ok(Json(
        profiles::update_profile(&state.db, &user.uuid, update).await?,
    ))
}

async fn avatar_upload(
    State(state): State<AppState>,
    current: CurrentUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let url = profiles::upload_avatar(
        &state.db,
        &state.config.avatar_root,
        &state.config.public_base_url,
        &user.uuid,
        content_type,
        &body,
    )
    .await?;
    Ok(Json(json!({ "avatar_url": url })))
}

async fn import_files(
    State(state): State<AppState>,
    current: CurrentUser,
    options: Option<Json<MigrationOptions>>,
) -> Result<(StatusCode, Json<MigrationReport>), AppError> {
    let user = current.require_user()?;
    let options = options.map(|Json(options)| options).unwrap_or_default();
    let report = import::migrate_all(&state.db, &state.files, &user.uuid, options).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn offline_store(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<OfflineData>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.sync.init_offline_store(&user.uuid).await?))
}

async fn offline_itinerary(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(date): Path<String>,
) -> Result<Json<DayProgram>, AppError> {
    let user = current.require_user()?;
    let date = parse_date(&date)?;
    state
        .sync
        .get_itinerary_offline(&user.uuid, date)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn offline_save(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(date): Path<String>,
    Json(program): Json<DayProgram>,
) -> Result<Json<DayProgram>, AppError> {
    let user = current.require_user()?;
    let date = parse_date(&date)?;
    Ok(Json(
        state
            .sync
            .save_itinerary_offline(&user.uuid, date, program)
            .await?,
    ))
}

async fn offline_dates(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<NaiveDate>>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.sync.available_dates_offline(&user.uuid).await?))
}

#[derive(Deserialize)]
struct OfflineStatusForm {
    status: ActivityStatus,
    date: Option<NaiveDate>,
}

async fn offline_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(activity_id): Path<String>,
    Json(form): Json<OfflineStatusForm>,
) -> Result<Json<DayProgram>, AppError> {
    let user = current.require_user()?;
    let date = match form.date {
        Some(date) => date,
        None => state
            .sync
            .date_of_activity(&user.uuid, &activity_id)
            .await?
            .ok_or(AppError::NotFound)?,
    };
    Ok(Json(
        state
            .sync
            .update_activity_status_offline(&user.uuid, date, &activity_id, form.status)
            .await?,
    ))
}

async fn sync_queue(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<SyncQueueItem>>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.sync.pending(&user.uuid).await?))
}

async fn sync_now(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<SyncReport>, AppError> {
    let user = current.require_user()?;
    let target = DbSyncTarget::new(state.db.clone(), user.uuid.clone());
    Ok(Json(
        state
            .sync
            .process_sync_queue(&user.uuid, &target)
            .await?,
    ))
}
