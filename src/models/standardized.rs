//! Shape of the per-day itinerary files produced by the standardization scripts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    activity::{ActivityStatus, ActivityType, Location, TransportDetail},
    itinerary::{DataSource, DayProgram, Document, ItineraryItem, Weather, WeatherInfo},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardizedDay {
    pub id: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub title: String,
    pub summary: Option<String>,
    pub weather: Option<Weather>,
    #[serde(default)]
    pub reminders: Vec<String>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub activities: Vec<StandardizedActivity>,
    #[serde(default)]
    pub travel_essentials: Vec<TravelEssential>,
    pub metadata: Option<DayMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardizedActivity {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub title: String,
    pub time: String,
    pub duration: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: ActivityStatus,
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
    pub attachments: Vec<Document>,
    pub original_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelEssential {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub packed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayMetadata {
    pub source: Option<String>,
    pub version: Option<String>,
    pub timezone: Option<String>,
    pub additional_data: Option<Value>,
}

impl StandardizedDay {
    pub fn metadata(&self) -> DayMetadata {
        self.metadata.clone().unwrap_or_default()
    }
}

/// Files store `HH:MM:SS`; the rest of the app speaks `HH:MM`.
pub fn short_time(time: &str) -> String {
    time.get(..5).unwrap_or(time).to_string()
}

impl From<StandardizedDay> for DayProgram {
    fn from(day: StandardizedDay) -> Self {
        let weather = day.weather.map(|weather| WeatherInfo {
            date: day.date,
            temperature: weather.temperature,
            condition: weather.condition,
            icon: weather.icon,
        });

        let items = day
            .activities
            .into_iter()
            .map(|activity| ItineraryItem {
                id: activity.id.unwrap_or_default(),
                activity_type: activity.activity_type,
                time: short_time(&activity.time),
                title: activity.title,
                duration: activity.duration,
                location: activity.location.map(Into::into),
                transport: activity.transport.map(Into::into),
                notes: activity.notes,
                attachments: activity
                    .attachments
                    .into_iter()
                    .map(|attachment| attachment.file_name)
                    .collect(),
                status: activity.status,
                important: activity.important,
                requires_confirmation: activity.requires_confirmation,
                is_group_event: activity.is_group_event,
                original_id: activity.original_id,
            })
            .collect();

        let additional_data = day
            .metadata
            .and_then(|metadata| metadata.additional_data)
            .unwrap_or_else(|| Value::Object(Default::default()));

        DayProgram {
            date: day.date,
            title: day.title,
            summary: day.summary.unwrap_or_default(),
            weather,
            reminders: day.reminders,
            docs: day.documents.into_iter().map(|doc| doc.file_name).collect(),
            items,
            source: DataSource::Standardized,
            additional_data: Some(additional_data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StandardizedDay {
        serde_json::from_value(json!({
            "id": "day-2025-06-16",
            "date": "2025-06-16",
            "title": "Match 8: CR Flamengo vs EST",
            "summary": "Trip to Philadelphia",
            "weather": { "temperature": 27, "condition": "Sunny", "icon": "sun" },
            "reminders": ["Bring tickets"],
            "documents": [{ "file_name": "ticket.pdf", "file_path": "docs/ticket.pdf" }],
            "activities": [{
                "id": "match-8",
                "type": "match",
                "title": "CR Flamengo vs EST",
                "time": "21:00:00",
                "status": "confirmed",
                "important": true,
                "sequence_order": 1,
                "location": {
                    "name": "Lincoln Financial Field",
                    "latitude": 39.9008,
                    "longitude": -75.1675,
                    "venue_type": "stadium"
                },
                "transport": {
                    "mode": "Train",
                    "seat_map": { "Alice": "12A" },
                    "shared_with": ["Bob"]
                },
                "attachments": [{ "file_name": "match-ticket.pdf" }]
            }],
            "metadata": { "source": "manual", "additional_data": { "city": "Philadelphia" } }
        }))
        .unwrap()
    }

    #[test]
    fn converts_to_day_program() {
        let program = DayProgram::from(sample());
        assert_eq!(program.source, DataSource::Standardized);
        assert_eq!(program.docs, vec!["ticket.pdf".to_string()]);
        let weather = program.weather.as_ref().unwrap();
        assert_eq!(weather.date, program.date);
        assert_eq!(weather.temperature, 27.0);

        let item = &program.items[0];
        assert_eq!(item.time, "21:00");
        assert_eq!(item.status, ActivityStatus::Confirmed);
        assert_eq!(item.attachments, vec!["match-ticket.pdf".to_string()]);
        let location = item.location.as_ref().unwrap();
        assert_eq!(location.lat, 39.9008);
        assert_eq!(location.venue_type.as_deref(), Some("stadium"));
        let transport = item.transport.as_ref().unwrap();
        assert_eq!(transport.seat_map.get("Alice").map(String::as_str), Some("12A"));
        assert_eq!(
            program.additional_data,
            Some(json!({ "city": "Philadelphia" }))
        );
    }

    #[test]
    fn short_time_keeps_already_short_values() {
        assert_eq!(short_time("09:00:00"), "09:00");
        assert_eq!(short_time("9:00"), "9:00");
        assert_eq!(short_time(""), "");
    }
}
