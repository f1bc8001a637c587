use serde::{Deserialize, Serialize};

use super::activity::ActivityType;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub trip_overview: TripOverview,
    pub itinerary_summary: Vec<DaySummary>,
    pub statistics: Statistics,
    pub upcoming_highlights: Vec<Highlight>,
    pub countdown: Option<Countdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripOverview {
    pub title: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub duration: usize,
    pub total_activities: usize,
    pub total_destinations: usize,
    pub travelers: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: String,
    pub title: String,
    pub summary: String,
    pub activity_count: usize,
    pub has_matches: bool,
    pub key_activities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_days: usize,
    pub total_activities: usize,
    pub total_transports: usize,
    pub total_meals: usize,
    pub total_matches: usize,
    pub unique_locations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub date: String,
    pub title: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub location: String,
    pub time: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub days_left: i64,
    pub progress: f64,
}
