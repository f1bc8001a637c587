use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        activity::{Activity, ActivityInput, ActivityPatch, ActivityStatus},
        dashboard::DashboardData,
        itinerary::{DayProgram, DayUpdate, Document, ItineraryDay, ItineraryItem, NewDay, Weather},
        trip::{NewTrip, Trip, TripUpdate},
    },
    services::{activities, dashboard, days, itinerary, trips},
    state::AppState,
};

use super::parse_date;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(trip_list).post(trip_create))
        .route(
            "/trips/:id",
            get(trip_detail).put(trip_update).delete(trip_delete),
        )
        .route("/trips/:id/dashboard", get(trip_dashboard))
        .route("/trips/:id/days", get(day_list).post(day_create))
        .route(
            "/days/:id",
            get(day_detail).put(day_update).delete(day_delete),
        )
        .route("/days/:id/weather", put(day_weather))
        .route("/days/:id/reminders", post(day_reminder))
        .route("/days/:id/documents", post(day_document))
        .route("/days/:id/activities", post(activity_create))
        .route(
            "/activities/:id",
            put(activity_update).delete(activity_delete),
        )
        .route("/activities/:id/status", patch(activity_status))
        .route("/itinerary/:date", get(itinerary_for_date))
}

async fn trip_list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Trip>>, AppError> {
    let user = current.require_user()?;
    Ok(Json(trips::list_trips(&state.db, &user.uuid).await?))
}

async fn trip_create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(new): Json<NewTrip>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let user = current.require_user()?;
    let trip = trips::create_trip(&state.db, &user.uuid, new).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn trip_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    let user = current.require_user()?;
    Ok(Json(trips::get_trip(&state.db, &user.uuid, &trip_id).await?))
}

async fn trip_update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(update): Json<TripUpdate>,
) -> Result<Json<Trip>, AppError> {
    let user = current.require_user()?;
    Ok(Json(
        trips::update_trip(&state.db, &user.uuid, &trip_id, update).await?,
    ))
}

async fn trip_delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    trips::delete_trip(&state.db, &user.uuid, &trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn trip_dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<DashboardData>, AppError> {
    let user = current.require_user()?;
    let today = Utc::now().date_naive();
    Ok(Json(
        dashboard::trip_dashboard(&state.db, &user.uuid, &trip_id, state.config.travelers, today)
            .await?,
    ))
}

async fn day_list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<Vec<ItineraryDay>>, AppError> {
    let user = current.require_user()?;
    Ok(Json(days::list_days(&state.db, &user.uuid, &trip_id).await?))
}

async fn day_create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Json(new): Json<NewDay>,
) -> Result<(StatusCode, Json<ItineraryDay>), AppError> {
    let user = current.require_user()?;
    let day = days::create_day(&state.db, &user.uuid, &trip_id, new).await?;
    Ok((StatusCode::CREATED, Json(day)))
}

async fn day_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(day_id): Path<String>,
) -> Result<Json<DayProgram>, AppError> {
    let user = current.require_user()?;
    Ok(Json(itinerary::fetch_day(&state.db, &user.uuid, &day_id).await?))
}

async fn day_update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(day_id): Path<String>,
    Json(update): Json<DayUpdate>,
) -> Result<Json<ItineraryDay>, AppError> {
    let user = current.require_user()?;
    Ok(Json(
        days::update_day(&state.db, &user.uuid, &day_id, update).await?,
    ))
}

async fn day_delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(day_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    days::delete_day(&state.db, &user.uuid, &day_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn day_weather(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(day_id): Path<String>,
    Json(weather): Json<Weather>,
) -> Result<Json<Weather>, AppError> {
    let user = current.require_user()?;
    Ok(Json(
        days::set_weather(&state.db, &user.uuid, &day_id, weather).await?,
    ))
}

#[derive(Deserialize)]
struct ReminderForm {
    text: String,
}

async fn day_reminder(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(day_id): Path<String>,
    Json(form): Json<ReminderForm>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    days::add_reminder(&state.db, &user.uuid, &day_id, &form.text).await?;
    Ok(StatusCode::CREATED)
}

async fn day_document(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(day_id): Path<String>,
    Json(document): Json<Document>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    days::add_document(&state.db, &user.uuid, &day_id, &document).await?;
    Ok(StatusCode::CREATED)
}

async fn activity_create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(day_id): Path<String>,
    Json(input): Json<ActivityInput>,
) -> Result<(StatusCode, Json<ItineraryItem>), AppError> {
    let user = current.require_user()?;
    let item = activities::create_activity(&state.db, &user.uuid, &day_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn activity_update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(activity_id): Path<String>,
    Json(patch): Json<ActivityPatch>,
) -> Result<Json<ItineraryItem>, AppError> {
    let user = current.require_user()?;
    Ok(Json(
        activities::update_activity(&state.db, &user.uuid, &activity_id, patch).await?,
    ))
}

async fn activity_delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(activity_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    activities::delete_activity(&state.db, &user.uuid, &activity_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct StatusForm {
    status: ActivityStatus,
}

async fn activity_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(activity_id): Path<String>,
    Json(form): Json<StatusForm>,
) -> Result<Json<Activity>, AppError> {
    let user = current.require_user()?;
    Ok(Json(
        activities::update_activity_status(&state.db, &user.uuid, &activity_id, form.status)
            .await?,
    ))
}

async fn itinerary_for_date(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(date): Path<String>,
) -> Result<Json<DayProgram>, AppError> {
    let user = current.require_user()?;
    let date = parse_date(&date)?;
    Ok(Json(
        itinerary::fetch_itinerary(&state.db, &state.files, &user.uuid, date).await?,
    ))
}
