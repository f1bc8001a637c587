use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use super::activity::{Activity, ActivityStatus, ActivityType, Location, TransportDetail};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ItineraryDay {
    pub id: String,
    pub trip_id: String,
    pub date: NaiveDate,
    pub title: String,
    pub summary: Option<String>,
    pub source: String,
    pub version: String,
    pub timezone: String,
    pub additional_data: Json<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItineraryDay {
    pub fn new(trip_id: &str, date: NaiveDate, title: String, summary: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.to_string(),
            date,
            title,
            summary,
            source: "manual".into(),
            version: "1.0".into(),
            timezone: "America/New_York".into(),
            additional_data: Json(Value::Object(Default::default())),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDay {
    pub date: NaiveDate,
    pub title: String,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayUpdate {
    pub date: Option<NaiveDate>,
    pub title: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Weather {
    pub temperature: f64,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub icon: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Document {
    pub file_name: String,
    #[serde(default)]
    pub file_path: String,
    pub file_type: Option<String>,
}

/// Where a [`DayProgram`] was read from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Standardized,
    Database,
    Offline,
}

/// Normalized read shape of one itinerary day, independent of where it came from.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayProgram {
    pub date: NaiveDate,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub weather: Option<WeatherInfo>,
    #[serde(default)]
    pub reminders: Vec<String>,
    #[serde(default)]
    pub docs: Vec<String>,
    #[serde(default)]
    pub items: Vec<ItineraryItem>,
    #[serde(rename = "_source", default)]
    pub source: DataSource,
    #[serde(rename = "_additionalData")]
    pub additional_data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherInfo {
    pub date: NaiveDate,
    pub temperature: f64,
    pub condition: String,
    pub icon: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryItem {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub title: String,
    pub time: String,
    pub duration: Option<String>,
    pub location: Option<ItemLocation>,
    pub transport: Option<ItemTransport>,
    pub notes: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub status: ActivityStatus,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default)]
    pub is_group_event: bool,
    pub original_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemLocation {
    pub name: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
    pub address: Option<String>,
    pub contact: Option<String>,
    pub confirmation_number: Option<String>,
    pub website: Option<String>,
    pub map_url: Option<String>,
    pub venue_type: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemTransport {
    pub mode: String,
    pub carrier: Option<String>,
    pub booking_reference: Option<String>,
    #[serde(default)]
    pub seat_map: BTreeMap<String, String>,
    pub pickup_time: Option<String>,
    pub pickup_location: Option<String>,
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub shared_with: Vec<String>,
    pub notes: Option<String>,
}

impl From<Location> for ItemLocation {
    fn from(location: Location) -> Self {
        Self {
            name: location.name,
            lat: location.latitude,
            lng: location.longitude,
            address: location.address,
            contact: location.contact,
            confirmation_number: location.confirmation_number,
            website: location.website,
            map_url: location.map_url,
            venue_type: location.venue_type,
        }
    }
}

impl From<ItemLocation> for Location {
    fn from(location: ItemLocation) -> Self {
        Self {
            name: location.name,
            address: location.address,
            latitude: location.lat,
            longitude: location.lng,
            contact: location.contact,
            confirmation_number: location.confirmation_number,
            website: location.website,
            map_url: location.map_url,
            venue_type: location.venue_type,
        }
    }
}

impl From<TransportDetail> for ItemTransport {
    fn from(transport: TransportDetail) -> Self {
        Self {
            mode: transport.mode,
            carrier: transport.carrier,
            booking_reference: transport.booking_reference,
            seat_map: transport.seat_map,
            pickup_time: transport.pickup_time,
            pickup_location: transport.pickup_location,
            estimated_cost: transport.estimated_cost,
            shared_with: transport.shared_with,
            notes: transport.notes,
        }
    }
}

impl From<ItemTransport> for TransportDetail {
    fn from(transport: ItemTransport) -> Self {
        Self {
            mode: transport.mode,
            carrier: transport.carrier,
            booking_reference: transport.booking_reference,
            pickup_time: transport.pickup_time,
            pickup_location: transport.pickup_location,
            estimated_cost: transport.estimated_cost,
            notes: transport.notes,
            seat_map: transport.seat_map,
            shared_with: transport.shared_with,
        }
    }
}

impl ItineraryItem {
    /// Builds the normalized item from a stored activity and its sub-records.
    pub fn from_parts(
        activity: Activity,
        location: Option<Location>,
        transport: Option<TransportDetail>,
        attachments: Vec<String>,
    ) -> Self {
        Self {
            id: activity.id,
            activity_type: activity.activity_type,
            title: activity.title,
            time: activity.time,
            duration: activity.duration,
            location: location.map(ItemLocation::from),
            transport: transport.map(ItemTransport::from),
            notes: activity.notes,
            attachments,
            status: activity.status,
            important: activity.important,
            requires_confirmation: activity.requires_confirmation,
            is_group_event: activity.is_group_event,
            original_id: None,
        }
    }
}

impl DayProgram {
    pub fn item_mut(&mut self, activity_id: &str) -> Option<&mut ItineraryItem> {
        self.items.iter_mut().find(|item| item.id == activity_id)
    }
}
