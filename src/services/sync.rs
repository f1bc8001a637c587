use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqliteConnection;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        activity::{Activity, ActivityPatch, ActivityStatus},
        itinerary::{DataSource, DayProgram, Document, ItineraryDay, Weather},
        sync::{
            DateKey, ItineraryPayload, OfflineData, SyncOperation, SyncQueueItem, SyncReport,
            ACTIVITIES_TABLE, ITINERARIES_TABLE,
        },
    },
};

use super::{activities, days, storage::StorageService, trips};

/// Destination of a queue drain.
#[async_trait]
pub trait SyncTarget: Send + Sync {
    async fn is_online(&self) -> bool;
    async fn apply(&self, item: &SyncQueueItem) -> Result<(), AppError>;
}

/// Offline snapshots and the pending-write queue of every user.
#[derive(Clone)]
pub struct SyncService {
    storage: StorageService,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SyncService {
    pub fn new(storage: StorageService) -> Self {
        Self {
            storage,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serializes access to one user's files; other users are not blocked.
    async fn lock_user(&self, user_uuid: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(user_uuid.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    async fn load_or_init(&self, user_uuid: &str) -> Result<OfflineData, AppError> {
        if let Some(data) = self.storage.load_offline_data(user_uuid).await? {
            return Ok(data);
        }
        let data = OfflineData::empty();
        self.storage.save_offline_data(user_uuid, &data).await?;
        Ok(data)
    }

    /// Existing snapshot, or a freshly written empty one.
    pub async fn init_offline_store(&self, user_uuid: &str) -> Result<OfflineData, AppError> {
        let _guard = self.lock_user(user_uuid).await;
        self.load_or_init(user_uuid).await
    }

    pub async fn save_itinerary_offline(
        &self,
        user_uuid: &str,
        date: NaiveDate,
        mut program: DayProgram,
    ) -> Result<DayProgram, AppError> {
        let _guard = self.lock_user(user_uuid).await;
        program.date = date;
        program.source = DataSource::Offline;

        let mut data = self.load_or_init(user_uuid).await?;
        data.itineraries.insert(date, program.clone());
        self.storage.save_offline_data(user_uuid, &data).await?;

        let payload = ItineraryPayload {
            date,
            itinerary: program.clone(),
        };
        self.push(
            user_uuid,
            SyncQueueItem::new(
                SyncOperation::Update,
                ITINERARIES_TABLE,
                serde_json::to_value(payload)?,
            ),
        )
        .await?;
        Ok(program)
    }

    pub async fn update_activity_status_offline(
        &self,
        user_uuid: &str,
        date: NaiveDate,
        activity_id: &str,
        status: ActivityStatus,
    ) -> Result<DayProgram, AppError> {
        let _guard = self.lock_user(user_uuid).await;
        let mut data = self.load_or_init(user_uuid).await?;
        let program = data.itineraries.get_mut(&date).ok_or(AppError::NotFound)?;
        let item = program.item_mut(activity_id).ok_or(AppError::NotFound)?;
        item.status = status;
        let program = program.clone();
        self.storage.save_offline_data(user_uuid, &data).await?;

        self.push(
            user_uuid,
            SyncQueueItem::new(
                SyncOperation::Update,
                ACTIVITIES_TABLE,
                json!({ "id": activity_id, "status": status }),
            ),
        )
        .await?;
        Ok(program)
    }

    /// Finds the offline snapshot holding `activity_id`.
    pub async fn date_of_activity(
        &self,
        user_uuid: &str,
        activity_id: &str,
    ) -> Result<Option<NaiveDate>, AppError> {
        let _guard = self.lock_user(user_uuid).await;
        let data = self.load_or_init(user_uuid).await?;
        Ok(data
            .itineraries
            .iter()
            .find(|(_, program)| program.items.iter().any(|item| item.id == activity_id))
            .map(|(date, _)| *date))
    }

    pub async fn get_itinerary_offline(
        &self,
        user_uuid: &str,
        date: NaiveDate,
    ) -> Result<Option<DayProgram>, AppError> {
        let _guard = self.lock_user(user_uuid).await;
        let mut data = self.load_or_init(user_uuid).await?;
        Ok(data.itineraries.remove(&date))
    }

    pub async fn available_dates_offline(&self, user_uuid: &str) -> Result<Vec<NaiveDate>, AppError> {
        let _guard = self.lock_user(user_uuid).await;
        let data = self.load_or_init(user_uuid).await?;
        // BTreeMap keys are already ascending.
        Ok(data.itineraries.into_keys().collect())
    }

    pub async fn enqueue(
        &self,
        user_uuid: &str,
        operation: SyncOperation,
        table: &str,
        data: Value,
    ) -> Result<SyncQueueItem, AppError> {
        let _guard = self.lock_user(user_uuid).await;
        let item = SyncQueueItem::new(operation, table, data);
        self.push(user_uuid, item.clone()).await?;
        Ok(item)
    }

    pub async fn pending(&self, user_uuid: &str) -> Result<Vec<SyncQueueItem>, AppError> {
        let _guard = self.lock_user(user_uuid).await;
        self.storage.load_sync_queue(user_uuid).await
    }

    async fn push(&self, user_uuid: &str, item: SyncQueueItem) -> Result<(), AppError> {
        let mut queue = self.storage.load_sync_queue(user_uuid).await?;
        debug!(user = %user_uuid, table = %item.table, "queued offline change");
        queue.push(item);
        self.storage.save_sync_queue(user_uuid, &queue).await
    }

    /// Replays the queue against `target` in insertion order. Items that fail
    /// stay queued in their original order.
    pub async fn process_sync_queue(
        &self,
        user_uuid: &str,
        target: &dyn SyncTarget,
    ) -> Result<SyncReport, AppError> {
        let _guard = self.lock_user(user_uuid).await;
        let queue = self.storage.load_sync_queue(user_uuid).await?;
        if queue.is_empty() {
            return Ok(SyncReport::default());
        }
        if !target.is_online().await {
            info!(user = %user_uuid, pending = queue.len(), "sync target offline, keeping queue");
            return Ok(SyncReport {
                success: 0,
                failed: 0,
                remaining: queue.len(),
            });
        }

        let mut report = SyncReport::default();
        let mut kept = Vec::new();
        for item in queue {
            match target.apply(&item).await {
                Ok(()) => report.success += 1,
                Err(err) => {
                    warn!(item = %item.id, table = %item.table, "sync item failed: {err}");
                    report.failed += 1;
                    kept.push(item);
                }
            }
        }
        report.remaining = kept.len();
        self.storage.save_sync_queue(user_uuid, &kept).await?;

        let mut data = self.load_or_init(user_uuid).await?;
        data.last_synced = Utc::now().timestamp_millis();
        self.storage.save_offline_data(user_uuid, &data).await?;

        info!(
            user = %user_uuid,
            success = report.success,
            failed = report.failed,
            "sync queue processed"
        );
        Ok(report)
    }
}

/// Applies queued changes to one user's data in the database.
pub struct DbSyncTarget {
    db: DbPool,
    user_uuid: String,
}

#[derive(Deserialize)]
struct ActivityKey {
    id: String,
}

impl DbSyncTarget {
    pub fn new(db: DbPool, user_uuid: impl Into<String>) -> Self {
        Self {
            db,
            user_uuid: user_uuid.into(),
        }
    }

    async fn upsert_itinerary(&self, payload: ItineraryPayload) -> Result<(), AppError> {
        let ItineraryPayload { date, itinerary } = payload;
        let mut conn = self.db.acquire().await?;
        let existing = days::find_day_by_date(&mut conn, &self.user_uuid, date).await?;
        drop(conn);

        let (day, is_new) = match existing {
            Some(day) => (day, false),
            None => {
                let Some(trip) = trips::trip_covering(&self.db, &self.user_uuid, date).await?
                else {
                    warn!(%date, "no trip covers synced itinerary date, skipping");
                    return Ok(());
                };
                let mut day = ItineraryDay::new(&trip.id, date, itinerary.title.clone(), None);
                day.source = "offline".into();
                (day, true)
            }
        };

        let mut tx = self.db.begin().await?;
        if is_new {
            days::insert_day(&mut tx, &day).await?;
        }
        write_program(&mut tx, day, itinerary).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_itinerary(&self, date: NaiveDate) -> Result<(), AppError> {
        let mut conn = self.db.acquire().await?;
        if let Some(day) = days::find_day_by_date(&mut conn, &self.user_uuid, date).await? {
            sqlx::query("DELETE FROM itinerary_days WHERE id = ?1")
                .bind(&day.id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    async fn patch_activity(&self, data: &Value) -> Result<(), AppError> {
        let key: ActivityKey = serde_json::from_value(data.clone())?;
        let patch: ActivityPatch = serde_json::from_value(data.clone())?;
        patch.validate()?;
        let mut tx = self.db.begin().await?;
        let activity = activities::find_activity(&mut tx, &self.user_uuid, &key.id)
            .await?
            .ok_or(AppError::NotFound)?;
        activities::apply_patch(&mut tx, activity, patch).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_activity(&self, data: &Value) -> Result<(), AppError> {
        let key: ActivityKey = serde_json::from_value(data.clone())?;
        activities::delete_activity(&self.db, &self.user_uuid, &key.id).await
    }
}

/// Writes a program's day fields and items onto a stored day. Items already on
/// the day keep their position; new ones go to the end.
async fn write_program(
    conn: &mut SqliteConnection,
    mut day: ItineraryDay,
    program: DayProgram,
) -> Result<(), AppError> {
    day.title = program.title;
    day.summary = Some(program.summary);
    day.updated_at = Utc::now();
    days::write_day_fields(conn, &day).await?;

    let weather = program.weather.map(|weather| Weather {
        temperature: weather.temperature,
        condition: weather.condition,
        icon: weather.icon,
    });
    days::replace_weather(conn, &day.id, weather.as_ref()).await?;
    days::replace_reminders(conn, &day.id, &program.reminders).await?;
    let documents: Vec<Document> = program
        .docs
        .into_iter()
        .map(|file_name| Document {
            file_name,
            file_path: String::new(),
            file_type: None,
        })
        .collect();
    days::replace_documents(conn, &day.id, &documents).await?;

    let mut existing: HashMap<String, Activity> = activities::list_activities(conn, &day.id)
        .await?
        .into_iter()
        .map(|activity| (activity.id.clone(), activity))
        .collect();

    for item in program.items {
        let location = item.location.map(Into::into);
        let transport = item.transport.map(Into::into);
        match existing.remove(&item.id) {
            Some(mut activity) => {
                activity.activity_type = item.activity_type;
                activity.title = item.title;
                activity.time = item.time;
                activity.duration = item.duration;
                activity.notes = item.notes;
                activity.status = item.status;
                activity.important = item.important;
                activity.requires_confirmation = item.requires_confirmation;
                activity.is_group_event = item.is_group_event;
                activity.updated_at = Utc::now();
                activities::write_activity_fields(conn, &activity).await?;
                if location.is_some() {
                    activities::replace_location(conn, &activity.id, location.as_ref()).await?;
                }
                if transport.is_some() {
                    activities::replace_transport(conn, &activity.id, transport.as_ref()).await?;
                }
            }
            None => {
                let now = Utc::now();
                let activity = Activity {
                    id: fresh_activity_id(conn, &item.id).await?,
                    itinerary_day_id: day.id.clone(),
                    activity_type: item.activity_type,
                    title: item.title,
                    time: item.time,
                    duration: item.duration,
                    notes: item.notes,
                    status: item.status,
                    important: item.important,
                    requires_confirmation: item.requires_confirmation,
                    is_group_event: item.is_group_event,
                    sequence_order: activities::next_sequence_order(conn, &day.id).await?,
                    created_at: now,
                    updated_at: now,
                };
                activities::insert_activity(conn, &activity).await?;
                activities::replace_location(conn, &activity.id, location.as_ref()).await?;
                activities::replace_transport(conn, &activity.id, transport.as_ref()).await?;
                let attachments: Vec<Document> = item
                    .attachments
                    .into_iter()
                    .map(|file_name| Document {
                        file_name,
                        file_path: String::new(),
                        file_type: None,
                    })
                    .collect();
                activities::insert_attachments(conn, &activity.id, &attachments).await?;
            }
        }
    }
    Ok(())
}

/// Keeps a client-side id when it is not taken so later queued edits still
/// find the activity.
async fn fresh_activity_id(conn: &mut SqliteConnection, candidate: &str) -> Result<String, AppError> {
    if candidate.trim().is_empty() {
        return Ok(Uuid::new_v4().to_string());
    }
    let taken: Option<i64> = sqlx::query_scalar("SELECT 1 FROM activities WHERE id = ?1")
        .bind(candidate)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(match taken {
        Some(_) => Uuid::new_v4().to_string(),
        None => candidate.to_string(),
    })
}

#[async_trait]
impl SyncTarget for DbSyncTarget {
    async fn is_online(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.db).await.is_ok()
    }

    async fn apply(&self, item: &SyncQueueItem) -> Result<(), AppError> {
        match (item.table.as_str(), item.operation) {
            (ITINERARIES_TABLE, SyncOperation::Create | SyncOperation::Update) => {
                let payload: ItineraryPayload = serde_json::from_value(item.data.clone())?;
                self.upsert_itinerary(payload).await
            }
            (ITINERARIES_TABLE, SyncOperation::Delete) => {
                let key: DateKey = serde_json::from_value(item.data.clone())?;
                self.delete_itinerary(key.date).await
            }
            (ACTIVITIES_TABLE, SyncOperation::Update) => self.patch_activity(&item.data).await,
            (ACTIVITIES_TABLE, SyncOperation::Delete) => self.delete_activity(&item.data).await,
            (table, operation) => {
                warn!(%table, ?operation, "unsupported sync item, dropping");
                Ok(())
            }
        }
    }
}
