use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;

use crate::{
    db::DbPool,
    error::AppError,
    models::itinerary::{DayUpdate, Document, ItineraryDay, NewDay, Weather},
};

use super::trips;

const DAY_COLUMNS: &str = "d.id, d.trip_id, d.date, d.title, d.summary, d.source, d.version, \
     d.timezone, d.additional_data, d.created_at, d.updated_at";

pub async fn list_days(
    db: &DbPool,
    user_uuid: &str,
    trip_id: &str,
) -> Result<Vec<ItineraryDay>, AppError> {
    trips::get_trip(db, user_uuid, trip_id).await?;
    let days = sqlx::query_as::<_, ItineraryDay>(&format!(
        "SELECT {DAY_COLUMNS} FROM itinerary_days d WHERE d.trip_id = ?1 ORDER BY d.date ASC"
    ))
    .bind(trip_id)
    .fetch_all(db)
    .await?;
    Ok(days)
}

pub async fn get_day(db: &DbPool, user_uuid: &str, day_id: &str) -> Result<ItineraryDay, AppError> {
    sqlx::query_as::<_, ItineraryDay>(&format!(
        "SELECT {DAY_COLUMNS} FROM itinerary_days d JOIN trips t ON t.id = d.trip_id \
         WHERE d.id = ?1 AND t.user_id = ?2"
    ))
    .bind(day_id)
    .bind(user_uuid)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound)
}

/// The user's day for `date`, preferring the trip that starts first.
pub async fn find_day_by_date(
    conn: &mut SqliteConnection,
    user_uuid: &str,
    date: NaiveDate,
) -> Result<Option<ItineraryDay>, AppError> {
    let day = sqlx::query_as::<_, ItineraryDay>(&format!(
        "SELECT {DAY_COLUMNS} FROM itinerary_days d JOIN trips t ON t.id = d.trip_id \
         WHERE d.date = ?1 AND t.user_id = ?2 ORDER BY t.start_date ASC LIMIT 1"
    ))
    .bind(date)
    .bind(user_uuid)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(day)
}

pub async fn insert_day(conn: &mut SqliteConnection, day: &ItineraryDay) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO itinerary_days \
         (id, trip_id, date, title, summary, source, version, timezone, additional_data, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )
    .bind(&day.id)
    .bind(&day.trip_id)
    .bind(day.date)
    .bind(&day.title)
    .bind(&day.summary)
    .bind(&day.source)
    .bind(&day.version)
    .bind(&day.timezone)
    .bind(&day.additional_data)
    .bind(day.created_at)
    .bind(day.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn create_day(
    db: &DbPool,
    user_uuid: &str,
    trip_id: &str,
    new: NewDay,
) -> Result<ItineraryDay, AppError> {
    let trip = trips::get_trip(db, user_uuid, trip_id).await?;
    if new.title.trim().is_empty() {
        return Err(AppError::BadRequest("Day title is required.".into()));
    }
    if !trip.covers(new.date) {
        return Err(AppError::BadRequest(format!(
            "{} is outside the trip ({} to {}).",
            new.date, trip.start_date, trip.end_date
        )));
    }
    let day = ItineraryDay::new(&trip.id, new.date, new.title.trim().to_string(), new.summary);
    let mut conn = db.acquire().await?;
    insert_day(&mut conn, &day).await?;
    Ok(day)
}

pub async fn update_day(
    db: &DbPool,
    user_uuid: &str,
    day_id: &str,
    update: DayUpdate,
) -> Result<ItineraryDay, AppError> {
    let mut day = get_day(db, user_uuid, day_id).await?;
    if let Some(date) = update.date {
        let trip = trips::get_trip(db, user_uuid, &day.trip_id).await?;
        if !trip.covers(date) {
            return Err(AppError::BadRequest(format!("{date} is outside the trip.")));
        }
        day.date = date;
    }
    if let Some(title) = update.title {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("Day title is required.".into()));
        }
        day.title = title.trim().to_string();
    }
    if let Some(summary) = update.summary {
        day.summary = Some(summary);
    }
    day.updated_at = Utc::now();
    let mut conn = db.acquire().await?;
    write_day_fields(&mut conn, &day).await?;
    Ok(day)
}

pub async fn write_day_fields(
    conn: &mut SqliteConnection,
    day: &ItineraryDay,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE itinerary_days SET date = ?1, title = ?2, summary = ?3, updated_at = ?4 WHERE id = ?5",
    )
    .bind(day.date)
    .bind(&day.title)
    .bind(&day.summary)
    .bind(day.updated_at)
    .bind(&day.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_day(db: &DbPool, user_uuid: &str, day_id: &str) -> Result<(), AppError> {
    let day = get_day(db, user_uuid, day_id).await?;
    sqlx::query("DELETE FROM itinerary_days WHERE id = ?1")
        .bind(&day.id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_weather(
    db: &DbPool,
    user_uuid: &str,
    day_id: &str,
    weather: Weather,
) -> Result<Weather, AppError> {
    let day = get_day(db, user_uuid, day_id).await?;
    let mut conn = db.acquire().await?;
    replace_weather(&mut conn, &day.id, Some(&weather)).await?;
    Ok(weather)
}

pub async fn add_reminder(
    db: &DbPool,
    user_uuid: &str,
    day_id: &str,
    text: &str,
) -> Result<(), AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("Reminder text is required.".into()));
    }
    let day = get_day(db, user_uuid, day_id).await?;
    sqlx::query("INSERT INTO reminders (itinerary_day_id, text) VALUES (?1, ?2)")
        .bind(&day.id)
        .bind(text)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn add_document(
    db: &DbPool,
    user_uuid: &str,
    day_id: &str,
    document: &Document,
) -> Result<(), AppError> {
    if document.file_name.trim().is_empty() {
        return Err(AppError::BadRequest("Document file name is required.".into()));
    }
    let day = get_day(db, user_uuid, day_id).await?;
    let mut conn = db.acquire().await?;
    insert_documents(&mut conn, &day.id, std::slice::from_ref(document)).await
}

pub async fn replace_weather(
    conn: &mut SqliteConnection,
    day_id: &str,
    weather: Option<&Weather>,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM weather WHERE itinerary_day_id = ?1")
        .bind(day_id)
        .execute(&mut *conn)
        .await?;
    if let Some(weather) = weather {
        sqlx::query(
            "INSERT INTO weather (itinerary_day_id, temperature, condition, icon) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(day_id)
        .bind(weather.temperature)
        .bind(&weather.condition)
        .bind(&weather.icon)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn replace_reminders(
    conn: &mut SqliteConnection,
    day_id: &str,
    reminders: &[String],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM reminders WHERE itinerary_day_id = ?1")
        .bind(day_id)
        .execute(&mut *conn)
        .await?;
    for text in reminders {
        sqlx::query("INSERT INTO reminders (itinerary_day_id, text) VALUES (?1, ?2)")
            .bind(day_id)
            .bind(text)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn insert_documents(
    conn: &mut SqliteConnection,
    day_id: &str,
    documents: &[Document],
) -> Result<(), AppError> {
    for doc in documents {
        sqlx::query(
            "INSERT INTO documents (itinerary_day_id, file_name, file_path, file_type) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(day_id)
        .bind(&doc.file_name)
        .bind(&doc.file_path)
        .bind(&doc.file_type)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn replace_documents(
    conn: &mut SqliteConnection,
    day_id: &str,
    documents: &[Document],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM documents WHERE itinerary_day_id = ?1")
        .bind(day_id)
        .execute(&mut *conn)
        .await?;
    insert_documents(conn, day_id, documents).await
}
