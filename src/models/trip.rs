use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTrip {
    pub title: String,
    pub destination: String,
    #[serde(alias = "startDate")]
    pub start_date: NaiveDate,
    #[serde(alias = "endDate")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripUpdate {
    pub title: Option<String>,
    pub destination: Option<String>,
    #[serde(alias = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(alias = "endDate")]
    pub end_date: Option<NaiveDate>,
}

impl NewTrip {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_fields(&self.title, &self.destination, self.start_date, self.end_date)
    }
}

impl TripUpdate {
    /// Applies the update onto `trip`, validating the merged result.
    pub fn apply_to(self, trip: &mut Trip) -> Result<(), AppError> {
        if let Some(title) = self.title {
            trip.title = title;
        }
        if let Some(destination) = self.destination {
            trip.destination = destination;
        }
        if let Some(start) = self.start_date {
            trip.start_date = start;
        }
        if let Some(end) = self.end_date {
            trip.end_date = end;
        }
        validate_fields(&trip.title, &trip.destination, trip.start_date, trip.end_date)
    }
}

fn validate_fields(
    title: &str,
    destination: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::BadRequest("Trip title is required.".into()));
    }
    if destination.trim().is_empty() {
        return Err(AppError::BadRequest("Trip destination is required.".into()));
    }
    if start > end {
        return Err(AppError::BadRequest(
            "Trip start date must not be after its end date.".into(),
        ));
    }
    Ok(())
}
