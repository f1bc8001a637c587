use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, SqliteConnection};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        activity::Activity,
        itinerary::ItineraryDay,
        standardized::{short_time, StandardizedDay},
        trip::NewTrip,
    },
};

use super::{activities, days, itinerary_files::ItineraryFiles, trips};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrationOptions {
    pub title: Option<String>,
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationReport {
    pub trip_id: String,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Imports every standardized file into a new trip owned by the user. Each
/// day is written in its own transaction so one bad file does not block the
/// others.
pub async fn migrate_all(
    db: &DbPool,
    files: &ItineraryFiles,
    user_uuid: &str,
    options: MigrationOptions,
) -> Result<MigrationReport, AppError> {
    let dates = files.available_dates().await;
    let (Some(&start_date), Some(&end_date)) = (dates.first(), dates.last()) else {
        return Err(AppError::BadRequest(
            "No standardized itinerary files to import.".into(),
        ));
    };

    let trip = trips::create_trip(
        db,
        user_uuid,
        NewTrip {
            title: options.title.unwrap_or_else(|| "World Cup 2025".into()),
            destination: options
                .destination
                .unwrap_or_else(|| "New Jersey, USA".into()),
            start_date,
            end_date,
        },
    )
    .await?;

    let mut report = MigrationReport {
        trip_id: trip.id.clone(),
        total: dates.len(),
        success: 0,
        failed: 0,
        errors: Vec::new(),
    };

    for date in dates {
        match migrate_date(db, files, &trip.id, date).await {
            Ok(()) => report.success += 1,
            Err(err) => {
                warn!(%date, "itinerary import failed: {err}");
                report.failed += 1;
                report.errors.push(format!("Error migrating {date}: {err}"));
            }
        }
    }

    info!(
        trip = %trip.id,
        success = report.success,
        failed = report.failed,
        "itinerary import finished"
    );
    Ok(report)
}

async fn migrate_date(
    db: &DbPool,
    files: &ItineraryFiles,
    trip_id: &str,
    date: NaiveDate,
) -> Result<(), AppError> {
    let day = files.load_day(date).await?.ok_or(AppError::NotFound)?;
    let mut tx = db.begin().await?;
    migrate_day(&mut tx, trip_id, day).await?;
    tx.commit().await?;
    Ok(())
}

async fn migrate_day(
    conn: &mut SqliteConnection,
    trip_id: &str,
    day: StandardizedDay,
) -> Result<(), AppError> {
    let metadata = day.metadata();
    let mut row = ItineraryDay::new(trip_id, day.date, day.title.clone(), day.summary.clone());
    row.source = metadata.source.unwrap_or_else(|| "json_migration".into());
    if let Some(version) = metadata.version {
        row.version = version;
    }
    if let Some(timezone) = metadata.timezone {
        row.timezone = timezone;
    }
    row.additional_data = Json(
        metadata
            .additional_data
            .unwrap_or_else(|| Value::Object(Default::default())),
    );
    days::insert_day(conn, &row).await?;

    days::replace_weather(conn, &row.id, day.weather.as_ref()).await?;
    days::replace_reminders(conn, &row.id, &day.reminders).await?;
    days::insert_documents(conn, &row.id, &day.documents).await?;

    for entry in day.activities {
        let sequence_order = match entry.sequence_order {
            Some(order) => order,
            None => activities::next_sequence_order(conn, &row.id).await?,
        };
        let now = Utc::now();
        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            itinerary_day_id: row.id.clone(),
            activity_type: entry.activity_type,
            title: entry.title,
            time: short_time(&entry.time),
            duration: entry.duration,
            notes: entry.notes,
            status: entry.status,
            important: entry.important,
            requires_confirmation: entry.requires_confirmation,
            is_group_event: entry.is_group_event,
            sequence_order,
            created_at: now,
            updated_at: now,
        };
        activities::insert_activity(conn, &activity).await?;
        activities::replace_location(conn, &activity.id, entry.location.as_ref()).await?;
        activities::replace_transport(conn, &activity.id, entry.transport.as_ref()).await?;
        activities::insert_attachments(conn, &activity.id, &entry.attachments).await?;
    }

    for essential in &day.travel_essentials {
        sqlx::query(
            "INSERT INTO travel_essentials (item_id, itinerary_day_id, name, category, packed) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&essential.id)
        .bind(&row.id)
        .bind(&essential.name)
        .bind(essential.category.as_deref().unwrap_or("General"))
        .bind(essential.packed)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
