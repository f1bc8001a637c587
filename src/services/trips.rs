use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{NewTrip, Trip, TripUpdate},
};

const TRIP_COLUMNS: &str =
    "id, user_id, title, destination, start_date, end_date, created_at, updated_at";

pub async fn list_trips(db: &DbPool, user_uuid: &str) -> Result<Vec<Trip>, AppError> {
    let trips = sqlx::query_as::<_, Trip>(&format!(
        "SELECT {TRIP_COLUMNS} FROM trips WHERE user_id = ?1 ORDER BY start_date ASC"
    ))
    .bind(user_uuid)
    .fetch_all(db)
    .await?;
    Ok(trips)
}

pub async fn get_trip(db: &DbPool, user_uuid: &str, trip_id: &str) -> Result<Trip, AppError> {
    sqlx::query_as::<_, Trip>(&format!(
        "SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1 AND user_id = ?2"
    ))
    .bind(trip_id)
    .bind(user_uuid)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound)
}

/// The earliest of the user's trips whose date range contains `date`.
pub async fn trip_covering(
    db: &DbPool,
    user_uuid: &str,
    date: NaiveDate,
) -> Result<Option<Trip>, AppError> {
    let trip = sqlx::query_as::<_, Trip>(&format!(
        "SELECT {TRIP_COLUMNS} FROM trips \
         WHERE user_id = ?1 AND start_date <= ?2 AND end_date >= ?2 \
         ORDER BY start_date ASC LIMIT 1"
    ))
    .bind(user_uuid)
    .bind(date)
    .fetch_optional(db)
    .await?;
    Ok(trip)
}

pub async fn create_trip(db: &DbPool, user_uuid: &str, new: NewTrip) -> Result<Trip, AppError> {
    new.validate()?;
    let now = Utc::now();
    let trip = Trip {
        id: Uuid::new_v4().to_string(),
        user_id: user_uuid.to_string(),
        title: new.title.trim().to_string(),
        destination: new.destination.trim().to_string(),
        start_date: new.start_date,
        end_date: new.end_date,
        created_at: now,
        updated_at: now,
    };
    sqlx::query(
        "INSERT INTO trips (id, user_id, title, destination, start_date, end_date, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&trip.id)
    .bind(&trip.user_id)
    .bind(&trip.title)
    .bind(&trip.destination)
    .bind(trip.start_date)
    .bind(trip.end_date)
    .bind(trip.created_at)
    .bind(trip.updated_at)
    .execute(db)
    .await?;
    info!(trip = %trip.id, "trip created");
    Ok(trip)
}

pub async fn update_trip(
    db: &DbPool,
    user_uuid: &str,
    trip_id: &str,
    update: TripUpdate,
) -> Result<Trip, AppError> {
    let mut trip = get_trip(db, user_uuid, trip_id).await?;
    update.apply_to(&mut trip)?;
    trip.updated_at = Utc::now();
    sqlx::query(
        "UPDATE trips SET title = ?1, destination = ?2, start_date = ?3, end_date = ?4, updated_at = ?5 \
         WHERE id = ?6",
    )
    .bind(&trip.title)
    .bind(&trip.destination)
    .bind(trip.start_date)
    .bind(trip.end_date)
    .bind(trip.updated_at)
    .bind(&trip.id)
    .execute(db)
    .await?;
    Ok(trip)
}

pub async fn delete_trip(db: &DbPool, user_uuid: &str, trip_id: &str) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM trips WHERE id = ?1 AND user_id = ?2")
        .bind(trip_id)
        .bind(user_uuid)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    info!(trip = %trip_id, "trip deleted");
    Ok(())
}
