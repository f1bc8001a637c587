use std::{collections::BTreeMap, fmt, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ActivityType {
    Transport,
    Match,
    Meal,
    Hotel,
    Activity,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Transport => "transport",
            ActivityType::Match => "match",
            ActivityType::Meal => "meal",
            ActivityType::Hotel => "hotel",
            ActivityType::Activity => "activity",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ActivityStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Pending => "pending",
            ActivityStatus::Confirmed => "confirmed",
            ActivityStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Activity row as stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: String,
    pub itinerary_day_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub title: String,
    pub time: String,
    pub duration: Option<String>,
    pub notes: Option<String>,
    pub status: ActivityStatus,
    pub important: bool,
    pub requires_confirmation: bool,
    pub is_group_event: bool,
    pub sequence_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Location {
    pub name: String,
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    pub contact: Option<String>,
    pub confirmation_number: Option<String>,
    pub website: Option<String>,
    pub map_url: Option<String>,
    pub venue_type: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct TransportDetail {
    pub mode: String,
    pub carrier: Option<String>,
    pub booking_reference: Option<String>,
    pub pickup_time: Option<String>,
    pub pickup_location: Option<String>,
    pub estimated_cost: Option<f64>,
    pub notes: Option<String>,
    #[sqlx(skip)]
    #[serde(default)]
    pub seat_map: BTreeMap<String, String>,
    #[sqlx(skip)]
    #[serde(default)]
    pub shared_with: Vec<String>,
}

/// Payload for creating an activity inside a day.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityInput {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub title: String,
    pub time: String,
    pub duration: Option<String>,
    pub notes: Option<String>,
    pub status: Option<ActivityStatus>,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default)]
    pub is_group_event: bool,
    pub sequence_order: Option<i64>,
    pub location: Option<Location>,
    pub transport: Option<TransportDetail>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Partial update; absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ActivityPatch {
    #[serde(rename = "type")]
    pub activity_type: Option<ActivityType>,
    pub title: Option<String>,
    pub time: Option<String>,
    pub duration: Option<String>,
    pub notes: Option<String>,
    pub status: Option<ActivityStatus>,
    pub important: Option<bool>,
    pub requires_confirmation: Option<bool>,
    pub is_group_event: Option<bool>,
    pub sequence_order: Option<i64>,
    pub location: Option<Location>,
    pub transport: Option<TransportDetail>,
}

static TIME_24H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$").expect("valid time regex"));

pub fn validate_time(time: &str) -> Result<(), AppError> {
    if TIME_24H.is_match(time) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Time must be in 24-hour format (HH:MM).".into(),
        ))
    }
}

pub fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().chars().count() < 2 {
        return Err(AppError::BadRequest(
            "Title must be at least 2 characters.".into(),
        ));
    }
    Ok(())
}

impl Location {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().chars().count() < 2 {
            return Err(AppError::BadRequest(
                "Location name must be at least 2 characters.".into(),
            ));
        }
        Ok(())
    }
}

impl TransportDetail {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.mode.trim().chars().count() < 2 {
            return Err(AppError::BadRequest(
                "Transport mode must be at least 2 characters.".into(),
            ));
        }
        Ok(())
    }
}

impl ActivityInput {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        validate_time(&self.time)?;
        if let Some(location) = &self.location {
            location.validate()?;
        }
        if let Some(transport) = &self.transport {
            transport.validate()?;
        }
        Ok(())
    }
}

impl ActivityPatch {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(time) = &self.time {
            validate_time(time)?;
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        if let Some(transport) = &self.transport {
            transport.validate()?;
        }
        Ok(())
    }
}
