use chrono::Utc;
use sqlx::{Row, SqliteConnection};
use tracing::info;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        activity::{
            Activity, ActivityInput, ActivityPatch, ActivityStatus, Location, TransportDetail,
        },
        itinerary::{Document, ItineraryItem},
    },
};

use super::days;

const ACTIVITY_COLUMNS: &str = "a.id, a.itinerary_day_id, a.type, a.title, a.time, a.duration, \
     a.notes, a.status, a.important, a.requires_confirmation, a.is_group_event, a.sequence_order, \
     a.created_at, a.updated_at";

pub async fn get_activity(
    db: &DbPool,
    user_uuid: &str,
    activity_id: &str,
) -> Result<Activity, AppError> {
    let mut conn = db.acquire().await?;
    find_activity(&mut conn, user_uuid, activity_id)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn find_activity(
    conn: &mut SqliteConnection,
    user_uuid: &str,
    activity_id: &str,
) -> Result<Option<Activity>, AppError> {
    let activity = sqlx::query_as::<_, Activity>(&format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities a \
         JOIN itinerary_days d ON d.id = a.itinerary_day_id \
         JOIN trips t ON t.id = d.trip_id \
         WHERE a.id = ?1 AND t.user_id = ?2"
    ))
    .bind(activity_id)
    .bind(user_uuid)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(activity)
}

pub async fn next_sequence_order(
    conn: &mut SqliteConnection,
    day_id: &str,
) -> Result<i64, AppError> {
    let max: Option<i64> =
        sqlx::query_scalar("SELECT MAX(sequence_order) FROM activities WHERE itinerary_day_id = ?1")
            .bind(day_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(max.map_or(1, |max| max + 1))
}

pub async fn insert_activity(
    conn: &mut SqliteConnection,
    activity: &Activity,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO activities (id, itinerary_day_id, type, title, time, duration, notes, status, \
         important, requires_confirmation, is_group_event, sequence_order, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )
    .bind(&activity.id)
    .bind(&activity.itinerary_day_id)
    .bind(activity.activity_type)
    .bind(&activity.title)
    .bind(&activity.time)
    .bind(&activity.duration)
    .bind(&activity.notes)
    .bind(activity.status)
    .bind(activity.important)
    .bind(activity.requires_confirmation)
    .bind(activity.is_group_event)
    .bind(activity.sequence_order)
    .bind(activity.created_at)
    .bind(activity.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn write_activity_fields(
    conn: &mut SqliteConnection,
    activity: &Activity,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE activities SET type = ?1, title = ?2, time = ?3, duration = ?4, notes = ?5, \
         status = ?6, important = ?7, requires_confirmation = ?8, is_group_event = ?9, \
         sequence_order = ?10, updated_at = ?11 WHERE id = ?12",
    )
    .bind(activity.activity_type)
    .bind(&activity.title)
    .bind(&activity.time)
    .bind(&activity.duration)
    .bind(&activity.notes)
    .bind(activity.status)
    .bind(activity.important)
    .bind(activity.requires_confirmation)
    .bind(activity.is_group_event)
    .bind(activity.sequence_order)
    .bind(activity.updated_at)
    .bind(&activity.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn replace_location(
    conn: &mut SqliteConnection,
    activity_id: &str,
    location: Option<&Location>,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM locations WHERE activity_id = ?1")
        .bind(activity_id)
        .execute(&mut *conn)
        .await?;
    let Some(location) = location else {
        return Ok(());
    };
    sqlx::query(
        "INSERT INTO locations (activity_id, name, address, latitude, longitude, contact, \
         confirmation_number, website, map_url, venue_type) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(activity_id)
    .bind(&location.name)
    .bind(&location.address)
    .bind(location.latitude)
    .bind(location.longitude)
    .bind(&location.contact)
    .bind(&location.confirmation_number)
    .bind(&location.website)
    .bind(&location.map_url)
    .bind(&location.venue_type)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn replace_transport(
    conn: &mut SqliteConnection,
    activity_id: &str,
    transport: Option<&TransportDetail>,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM transport_details WHERE activity_id = ?1")
        .bind(activity_id)
        .execute(&mut *conn)
        .await?;
    let Some(transport) = transport else {
        return Ok(());
    };
    let transport_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO transport_details (id, activity_id, mode, carrier, booking_reference, \
         pickup_time, pickup_location, estimated_cost, notes) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&transport_id)
    .bind(activity_id)
    .bind(&transport.mode)
    .bind(&transport.carrier)
    .bind(&transport.booking_reference)
    .bind(&transport.pickup_time)
    .bind(&transport.pickup_location)
    .bind(transport.estimated_cost)
    .bind(&transport.notes)
    .execute(&mut *conn)
    .await?;

    for (passenger, seat) in &transport.seat_map {
        sqlx::query(
            "INSERT INTO seat_maps (transport_detail_id, passenger_name, seat_number) VALUES (?1, ?2, ?3)",
        )
        .bind(&transport_id)
        .bind(passenger)
        .bind(seat)
        .execute(&mut *conn)
        .await?;
    }
    for name in &transport.shared_with {
        sqlx::query("INSERT INTO shared_transport (transport_detail_id, shared_with) VALUES (?1, ?2)")
            .bind(&transport_id)
            .bind(name)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn insert_attachments(
    conn: &mut SqliteConnection,
    activity_id: &str,
    attachments: &[Document],
) -> Result<(), AppError> {
    for attachment in attachments {
        sqlx::query(
            "INSERT INTO attachments (activity_id, file_name, file_path, file_type) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(activity_id)
        .bind(&attachment.file_name)
        .bind(&attachment.file_path)
        .bind(&attachment.file_type)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Inserts the activity with its location, transport and attachments in one
/// transaction.
pub async fn create_activity(
    db: &DbPool,
    user_uuid: &str,
    day_id: &str,
    input: ActivityInput,
) -> Result<ItineraryItem, AppError> {
    input.validate()?;
    let day = days::get_day(db, user_uuid, day_id).await?;

    let mut tx = db.begin().await?;
    let sequence_order = match input.sequence_order {
        Some(order) => order,
        None => next_sequence_order(&mut tx, &day.id).await?,
    };
    let now = Utc::now();
    let activity = Activity {
        id: Uuid::new_v4().to_string(),
        itinerary_day_id: day.id.clone(),
        activity_type: input.activity_type,
        title: input.title.trim().to_string(),
        time: input.time,
        duration: input.duration,
        notes: input.notes,
        status: input.status.unwrap_or_default(),
        important: input.important,
        requires_confirmation: input.requires_confirmation,
        is_group_event: input.is_group_event,
        sequence_order,
        created_at: now,
        updated_at: now,
    };
    insert_activity(&mut tx, &activity).await?;
    replace_location(&mut tx, &activity.id, input.location.as_ref()).await?;
    replace_transport(&mut tx, &activity.id, input.transport.as_ref()).await?;
    let attachments: Vec<Document> = input
        .attachments
        .into_iter()
        .map(|file_name| Document {
            file_name,
            file_path: String::new(),
            file_type: None,
        })
        .collect();
    insert_attachments(&mut tx, &activity.id, &attachments).await?;
    tx.commit().await?;

    info!(activity = %activity.id, day = %day.id, "activity created");
    let mut conn = db.acquire().await?;
    load_item(&mut conn, activity).await
}

/// Applies `patch` to the stored activity; location and transport are
/// replaced when present in the patch.
pub async fn apply_patch(
    conn: &mut SqliteConnection,
    mut activity: Activity,
    patch: ActivityPatch,
) -> Result<Activity, AppError> {
    if let Some(activity_type) = patch.activity_type {
        activity.activity_type = activity_type;
    }
    if let Some(title) = patch.title {
        activity.title = title.trim().to_string();
    }
    if let Some(time) = patch.time {
        activity.time = time;
    }
    if patch.duration.is_some() {
        activity.duration = patch.duration;
    }
    if patch.notes.is_some() {
        activity.notes = patch.notes;
    }
    if let Some(status) = patch.status {
        activity.status = status;
    }
    if let Some(important) = patch.important {
        activity.important = important;
    }
    if let Some(requires_confirmation) = patch.requires_confirmation {
        activity.requires_confirmation = requires_confirmation;
    }
    if let Some(is_group_event) = patch.is_group_event {
        activity.is_group_event = is_group_event;
    }
    if let Some(order) = patch.sequence_order {
        activity.sequence_order = order;
    }
    activity.updated_at = Utc::now();
    write_activity_fields(conn, &activity).await?;

    if let Some(location) = patch.location {
        replace_location(conn, &activity.id, Some(&location)).await?;
    }
    if let Some(transport) = patch.transport {
        replace_transport(conn, &activity.id, Some(&transport)).await?;
    }
    Ok(activity)
}

pub async fn update_activity(
    db: &DbPool,
    user_uuid: &str,
    activity_id: &str,
    patch: ActivityPatch,
) -> Result<ItineraryItem, AppError> {
    patch.validate()?;
    let mut tx = db.begin().await?;
    let activity = find_activity(&mut tx, user_uuid, activity_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let activity = apply_patch(&mut tx, activity, patch).await?;
    tx.commit().await?;
    let mut conn = db.acquire().await?;
    load_item(&mut conn, activity).await
}

/// Sets any status regardless of the current one.
pub async fn update_activity_status(
    db: &DbPool,
    user_uuid: &str,
    activity_id: &str,
    status: ActivityStatus,
) -> Result<Activity, AppError> {
    let mut activity = get_activity(db, user_uuid, activity_id).await?;
    activity.status = status;
    activity.updated_at = Utc::now();
    sqlx::query("UPDATE activities SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(activity.status)
        .bind(activity.updated_at)
        .bind(&activity.id)
        .execute(db)
        .await?;
    Ok(activity)
}

pub async fn delete_activity(
    db: &DbPool,
    user_uuid: &str,
    activity_id: &str,
) -> Result<(), AppError> {
    let activity = get_activity(db, user_uuid, activity_id).await?;
    sqlx::query("DELETE FROM activities WHERE id = ?1")
        .bind(&activity.id)
        .execute(db)
        .await?;
    info!(activity = %activity.id, "activity deleted");
    Ok(())
}

pub async fn list_activities(
    conn: &mut SqliteConnection,
    day_id: &str,
) -> Result<Vec<Activity>, AppError> {
    let activities = sqlx::query_as::<_, Activity>(&format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities a WHERE a.itinerary_day_id = ?1 \
         ORDER BY a.sequence_order ASC"
    ))
    .bind(day_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(activities)
}

/// Joins an activity with its location, transport and attachments.
pub async fn load_item(
    conn: &mut SqliteConnection,
    activity: Activity,
) -> Result<ItineraryItem, AppError> {
    let location = sqlx::query_as::<_, Location>(
        "SELECT name, address, latitude, longitude, contact, confirmation_number, website, \
         map_url, venue_type FROM locations WHERE activity_id = ?1",
    )
    .bind(&activity.id)
    .fetch_optional(&mut *conn)
    .await?;

    let transport_row = sqlx::query(
        "SELECT id, mode, carrier, booking_reference, pickup_time, pickup_location, \
         estimated_cost, notes FROM transport_details WHERE activity_id = ?1",
    )
    .bind(&activity.id)
    .fetch_optional(&mut *conn)
    .await?;

    let transport = match transport_row {
        Some(row) => {
            let transport_id: String = row.try_get("id")?;
            let seats = sqlx::query(
                "SELECT passenger_name, seat_number FROM seat_maps WHERE transport_detail_id = ?1",
            )
            .bind(&transport_id)
            .fetch_all(&mut *conn)
            .await?;
            let shared_with: Vec<String> = sqlx::query_scalar(
                "SELECT shared_with FROM shared_transport WHERE transport_detail_id = ?1 ORDER BY id",
            )
            .bind(&transport_id)
            .fetch_all(&mut *conn)
            .await?;
            let mut seat_map = std::collections::BTreeMap::new();
            for seat in seats {
                seat_map.insert(
                    seat.try_get::<String, _>("passenger_name")?,
                    seat.try_get::<String, _>("seat_number")?,
                );
            }
            Some(TransportDetail {
                mode: row.try_get("mode")?,
                carrier: row.try_get("carrier")?,
                booking_reference: row.try_get("booking_reference")?,
                pickup_time: row.try_get("pickup_time")?,
                pickup_location: row.try_get("pickup_location")?,
                estimated_cost: row.try_get("estimated_cost")?,
                notes: row.try_get("notes")?,
                seat_map,
                shared_with,
            })
        }
        None => None,
    };

    let attachments: Vec<String> =
        sqlx::query_scalar("SELECT file_name FROM attachments WHERE activity_id = ?1 ORDER BY id")
            .bind(&activity.id)
            .fetch_all(&mut *conn)
            .await?;

    Ok(ItineraryItem::from_parts(
        activity,
        location,
        transport,
        attachments,
    ))
}
