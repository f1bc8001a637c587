use std::{
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use tokio::fs;
use tracing::{error, warn};

use crate::{
    error::AppError,
    models::{itinerary::DayProgram, standardized::StandardizedDay},
};

static FILE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})\.json$").expect("valid file date regex"));

/// Read access to the standardized per-day itinerary files.
#[derive(Clone)]
pub struct ItineraryFiles {
    dir: Arc<PathBuf>,
}

impl ItineraryFiles {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Arc::new(dir) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn file_names(&self) -> Result<Vec<String>, AppError> {
        let mut entries = fs::read_dir(self.dir()).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Dates for which a standardized file exists, ascending. An unreadable
    /// directory yields an empty list.
    pub async fn available_dates(&self) -> Vec<NaiveDate> {
        match self.file_names().await {
            Ok(names) => dates_from_file_names(&names),
            Err(err) => {
                error!(dir = %self.dir().display(), "listing itinerary files failed: {err}");
                Vec::new()
            }
        }
    }

    async fn file_for(&self, date: NaiveDate) -> Result<Option<PathBuf>, AppError> {
        let needle = date.to_string();
        let names = self.file_names().await?;
        Ok(names
            .into_iter()
            .find(|name| {
                name.contains(&needle)
                    && name.ends_with(".json")
                    && !name.contains("validation_errors")
            })
            .map(|name| self.dir().join(name)))
    }

    async fn read_raw(&self, date: NaiveDate) -> Result<Option<Value>, AppError> {
        let Some(path) = self.file_for(date).await? else {
            return Ok(None);
        };
        let raw = fs::read(&path).await?;
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    /// Raw JSON of the first file mentioning `date`. A missing directory or an
    /// unreadable file counts as no file.
    pub async fn load_raw(&self, date: NaiveDate) -> Option<Value> {
        match self.read_raw(date).await {
            Ok(Some(raw)) => Some(raw),
            Ok(None) => {
                warn!(%date, "no standardized itinerary file for date");
                None
            }
            Err(err) => {
                error!(%date, dir = %self.dir().display(), "reading itinerary file failed: {err}");
                None
            }
        }
    }

    /// Strict load used by the importer, which reports the failure cause.
    pub async fn load_day(&self, date: NaiveDate) -> Result<Option<StandardizedDay>, AppError> {
        match self.read_raw(date).await? {
            Some(raw) => Ok(Some(serde_json::from_value(raw)?)),
            None => Ok(None),
        }
    }

    pub async fn load_day_program(&self, date: NaiveDate) -> Option<DayProgram> {
        match self.load_day(date).await {
            Ok(day) => day.map(DayProgram::from),
            Err(err) => {
                error!(%date, dir = %self.dir().display(), "loading itinerary file failed: {err}");
                None
            }
        }
    }

    /// Every parsable day, in date order. Files that fail to load are skipped.
    pub async fn load_all(&self) -> Vec<StandardizedDay> {
        let mut days = Vec::new();
        for date in self.available_dates().await {
            match self.load_day(date).await {
                Ok(Some(day)) => days.push(day),
                Ok(None) => {}
                Err(err) => warn!(%date, "skipping unreadable itinerary file: {err}"),
            }
        }
        days
    }
}

pub fn dates_from_file_names<S: AsRef<str>>(names: &[S]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| name.ends_with(".json") && !name.contains("validation_errors"))
        .filter_map(|name| FILE_DATE.captures(name))
        .filter_map(|caps| caps[1].parse().ok())
        .collect();
    dates.sort();
    dates.dedup();
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[tokio::test]
    async fn missing_directory_reads_as_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let files = ItineraryFiles::new(tmp.path().join("absent"));
        assert!(files.available_dates().await.is_empty());
        assert!(files.load_raw(date("2025-06-18")).await.is_none());
        assert!(files.load_day_program(date("2025-06-18")).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("18-06_2025-06-18.json"), "{not json").unwrap();
        let files = ItineraryFiles::new(tmp.path().to_path_buf());
        assert_eq!(files.available_dates().await, vec![date("2025-06-18")]);
        assert!(files.load_raw(date("2025-06-18")).await.is_none());
        assert!(files.load_day_program(date("2025-06-18")).await.is_none());
        assert!(files.load_day(date("2025-06-18")).await.is_err());
    }

    #[tokio::test]
    async fn validation_reports_are_never_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("validation_errors_2025-06-18.json"),
            r#"{"errors": []}"#,
        )
        .unwrap();
        let files = ItineraryFiles::new(tmp.path().to_path_buf());
        assert!(files.load_raw(date("2025-06-18")).await.is_none());
    }

    #[test]
    fn extracts_sorted_dates_from_names() {
        let names = [
            "16-06_2025-06-16.json",
            "14-06_2025-06-14.json",
            "validation_errors_2025-06-15.json",
            "notes_2025-06-17.txt",
            "readme.json",
            "2025-13-40.json",
        ];
        let dates = dates_from_file_names(&names);
        assert_eq!(
            dates,
            vec![
                "2025-06-14".parse::<NaiveDate>().unwrap(),
                "2025-06-16".parse::<NaiveDate>().unwrap(),
            ]
        );
    }
}
