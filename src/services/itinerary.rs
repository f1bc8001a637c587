use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::{
    db::DbPool,
    error::AppError,
    models::itinerary::{DataSource, DayProgram, ItineraryDay, Weather, WeatherInfo},
};

use super::{activities, days, itinerary_files::ItineraryFiles};

/// Assembles the normalized program of a stored day.
pub async fn day_program(
    conn: &mut SqliteConnection,
    day: ItineraryDay,
) -> Result<DayProgram, AppError> {
    let weather = sqlx::query_as::<_, Weather>(
        "SELECT temperature, condition, icon FROM weather WHERE itinerary_day_id = ?1",
    )
    .bind(&day.id)
    .fetch_optional(&mut *conn)
    .await?
    .map(|weather| WeatherInfo {
        date: day.date,
        temperature: weather.temperature,
        condition: weather.condition,
        icon: weather.icon,
    });

    let reminders: Vec<String> =
        sqlx::query_scalar("SELECT text FROM reminders WHERE itinerary_day_id = ?1 ORDER BY id")
            .bind(&day.id)
            .fetch_all(&mut *conn)
            .await?;
    let docs: Vec<String> = sqlx::query_scalar(
        "SELECT file_name FROM documents WHERE itinerary_day_id = ?1 ORDER BY id",
    )
    .bind(&day.id)
    .fetch_all(&mut *conn)
    .await?;

    let mut items = Vec::new();
    for activity in activities::list_activities(conn, &day.id).await? {
        items.push(activities::load_item(conn, activity).await?);
    }

    Ok(DayProgram {
        date: day.date,
        title: day.title,
        summary: day.summary.unwrap_or_default(),
        weather,
        reminders,
        docs,
        items,
        source: DataSource::Database,
        additional_data: Some(day.additional_data.0),
    })
}

/// The user's program for `date`; the standardized file stands in when the
/// store has no such day.
pub async fn fetch_itinerary(
    db: &DbPool,
    files: &ItineraryFiles,
    user_uuid: &str,
    date: NaiveDate,
) -> Result<DayProgram, AppError> {
    let mut conn = db.acquire().await?;
    if let Some(day) = days::find_day_by_date(&mut conn, user_uuid, date).await? {
        return day_program(&mut conn, day).await;
    }
    debug!(%date, "no stored day, falling back to itinerary file");
    files
        .load_day_program(date)
        .await
        .ok_or(AppError::NotFound)
}

pub async fn fetch_day(db: &DbPool, user_uuid: &str, day_id: &str) -> Result<DayProgram, AppError> {
    let day = days::get_day(db, user_uuid, day_id).await?;
    let mut conn = db.acquire().await?;
    day_program(&mut conn, day).await
}

/// Programs of every day in a trip, in date order.
pub async fn trip_programs(
    db: &DbPool,
    user_uuid: &str,
    trip_id: &str,
) -> Result<Vec<DayProgram>, AppError> {
    let days = days::list_days(db, user_uuid, trip_id).await?;
    let mut conn = db.acquire().await?;
    let mut programs = Vec::with_capacity(days.len());
    for day in days {
        programs.push(day_program(&mut conn, day).await?);
    }
    Ok(programs)
}
