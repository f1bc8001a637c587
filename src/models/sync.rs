use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::itinerary::DayProgram;

pub const ITINERARIES_TABLE: &str = "itineraries";
pub const ACTIVITIES_TABLE: &str = "activities";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

/// One pending write recorded while the store was unreachable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncQueueItem {
    pub id: String,
    pub operation: SyncOperation,
    pub table: String,
    pub data: Value,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
}

impl SyncQueueItem {
    pub fn new(operation: SyncOperation, table: impl Into<String>, data: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            operation,
            table: table.into(),
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfflineData {
    #[serde(default)]
    pub itineraries: BTreeMap<NaiveDate, DayProgram>,
    pub last_synced: i64,
}

impl OfflineData {
    pub fn empty() -> Self {
        Self {
            itineraries: BTreeMap::new(),
            last_synced: Utc::now().timestamp_millis(),
        }
    }
}

/// Payload of an `itineraries` create/update item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryPayload {
    pub date: NaiveDate,
    pub itinerary: DayProgram,
}

/// Payload of an `itineraries` delete item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateKey {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    pub success: usize,
    pub failed: usize,
    pub remaining: usize,
}
