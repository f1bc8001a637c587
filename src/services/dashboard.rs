use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::warn;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        activity::ActivityType,
        dashboard::{Countdown, DashboardData, DaySummary, Highlight, Statistics, TripOverview},
        itinerary::DayProgram,
    },
};

use super::{itinerary, itinerary_files::ItineraryFiles};

const COUNTDOWN_WINDOW_DAYS: f64 = 14.0;
const HIGHLIGHT_LIMIT: usize = 5;
const KEY_ACTIVITY_LIMIT: usize = 3;

/// Summarizes a set of day programs. Days are sorted by date first.
pub fn aggregate(days: &[DayProgram], travelers: u32) -> DashboardData {
    let mut days: Vec<&DayProgram> = days.iter().collect();
    days.sort_by_key(|day| day.date);

    let mut statistics = Statistics {
        total_days: days.len(),
        ..Statistics::default()
    };
    let mut location_counts: HashMap<&str, usize> = HashMap::new();
    let mut location_order: Vec<&str> = Vec::new();
    let mut itinerary_summary = Vec::with_capacity(days.len());
    let mut upcoming_highlights = Vec::new();

    for day in &days {
        let mut has_matches = false;
        for item in &day.items {
            statistics.total_activities += 1;
            match item.activity_type {
                ActivityType::Transport => statistics.total_transports += 1,
                ActivityType::Meal => statistics.total_meals += 1,
                ActivityType::Match => {
                    statistics.total_matches += 1;
                    has_matches = true;
                }
                ActivityType::Hotel | ActivityType::Activity => {}
            }

            let location = item.location.as_ref().map(|location| location.name.as_str());
            if let Some(name) = location.filter(|name| !name.is_empty()) {
                let count = location_counts.entry(name).or_insert(0);
                if *count == 0 {
                    location_order.push(name);
                }
                *count += 1;
            }

            let is_highlight = item.activity_type == ActivityType::Match || item.important;
            if is_highlight && upcoming_highlights.len() < HIGHLIGHT_LIMIT {
                upcoming_highlights.push(Highlight {
                    date: day.date.to_string(),
                    title: item.title.clone(),
                    activity_type: item.activity_type,
                    location: location.unwrap_or("TBD").to_string(),
                    time: item.time.clone(),
                });
            }
        }

        let title = if day.title.is_empty() {
            format!("Day {}", day.date)
        } else {
            day.title.clone()
        };
        itinerary_summary.push(DaySummary {
            date: day.date.to_string(),
            title,
            summary: day.summary.clone(),
            activity_count: day.items.len(),
            has_matches,
            key_activities: day
                .items
                .iter()
                .filter(|item| item.activity_type != ActivityType::Transport)
                .take(KEY_ACTIVITY_LIMIT)
                .map(|item| item.title.clone())
                .collect(),
        });
    }
    statistics.unique_locations = location_counts.len();

    // Ties go to the location seen first.
    let main_location = location_order
        .iter()
        .copied()
        .fold(None::<(&str, usize)>, |best, name| {
            let count = location_counts[name];
            match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((name, count)),
            }
        })
        .map(|(name, _)| name);
    let destination = match main_location {
        Some(name) if name.contains("USA") => "USA".to_string(),
        Some(name) => name.to_string(),
        None => "Multiple Destinations".to_string(),
    };

    let title = match days.first() {
        Some(day) if day.title.contains("FIFA") || day.title.contains("World Cup") => {
            "FIFA Club World Cup 2025™"
        }
        _ => "World Cup Adventure 2025",
    };

    DashboardData {
        trip_overview: TripOverview {
            title: title.to_string(),
            destination,
            start_date: days.first().map(|day| format_date(day.date)).unwrap_or_default(),
            end_date: days.last().map(|day| format_date(day.date)).unwrap_or_default(),
            duration: days.len(),
            total_activities: statistics.total_activities,
            total_destinations: statistics.unique_locations,
            travelers,
        },
        itinerary_summary,
        statistics,
        upcoming_highlights,
        countdown: None,
    }
}

/// "June 16, 2025"
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn countdown(start: NaiveDate, today: NaiveDate) -> Countdown {
    let days_left = (start - today).num_days();
    let progress =
        ((COUNTDOWN_WINDOW_DAYS - days_left as f64) / COUNTDOWN_WINDOW_DAYS * 100.0).clamp(0.0, 100.0);
    Countdown {
        days_left,
        progress,
    }
}

/// Fixed dataset shown when no itinerary file can be loaded.
pub fn fallback(travelers: u32) -> DashboardData {
    DashboardData {
        trip_overview: TripOverview {
            title: "FIFA Club World Cup 2025™".into(),
            destination: "USA".into(),
            start_date: "June 15, 2025".into(),
            end_date: "June 28, 2025".into(),
            duration: 14,
            total_activities: 45,
            total_destinations: 5,
            travelers,
        },
        itinerary_summary: vec![
            DaySummary {
                date: "2025-06-15".into(),
                title: "Arrival Day".into(),
                summary: "Arrival and initial exploration".into(),
                activity_count: 5,
                has_matches: false,
                key_activities: vec![
                    "Airport Transfer".into(),
                    "Hotel Check-in".into(),
                    "City Tour".into(),
                ],
            },
            DaySummary {
                date: "2025-06-16".into(),
                title: "Opening Ceremony".into(),
                summary: "FIFA Club World Cup opening ceremony".into(),
                activity_count: 6,
                has_matches: true,
                key_activities: vec![
                    "Opening Ceremony".into(),
                    "Welcome Dinner".into(),
                    "Stadium Tour".into(),
                ],
            },
        ],
        statistics: Statistics {
            total_days: 14,
            total_activities: 45,
            total_transports: 12,
            total_meals: 18,
            total_matches: 8,
            unique_locations: 15,
        },
        upcoming_highlights: vec![Highlight {
            date: "2025-06-16".into(),
            title: "Opening Ceremony".into(),
            activity_type: ActivityType::Match,
            location: "Al Bayt Stadium".into(),
            time: "18:00".into(),
        }],
        countdown: None,
    }
}

/// Dashboard over the standardized files, with a countdown to the first day.
pub async fn load_dashboard(files: &ItineraryFiles, travelers: u32, today: NaiveDate) -> DashboardData {
    let programs: Vec<DayProgram> = files
        .load_all()
        .await
        .into_iter()
        .map(DayProgram::from)
        .collect();
    let Some(start) = programs.iter().map(|program| program.date).min() else {
        warn!("no itinerary files loaded, serving fallback dashboard");
        let mut data = fallback(travelers);
        data.countdown = NaiveDate::from_ymd_opt(2025, 6, 15).map(|start| countdown(start, today));
        return data;
    };
    let mut data = aggregate(&programs, travelers);
    data.countdown = Some(countdown(start, today));
    data
}

/// Dashboard over the days stored for one trip, counting down to its start date.
pub async fn trip_dashboard(
    db: &DbPool,
    user_uuid: &str,
    trip_id: &str,
    travelers: u32,
    today: NaiveDate,
) -> Result<DashboardData, AppError> {
    let trip = super::trips::get_trip(db, user_uuid, trip_id).await?;
    let programs = itinerary::trip_programs(db, user_uuid, trip_id).await?;
    let mut data = aggregate(&programs, travelers);
    data.trip_overview.title = trip.title;
    data.trip_overview.destination = trip.destination;
    data.trip_overview.start_date = format_date(trip.start_date);
    data.trip_overview.end_date = format_date(trip.end_date);
    data.countdown = Some(countdown(trip.start_date, today));
    Ok(data)
}
