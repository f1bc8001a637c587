use std::{env, net::SocketAddr, path::PathBuf};

use url::Url;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    /// Directory holding the standardized per-day itinerary files.
    pub itinerary_dir: PathBuf,
    /// Root of the per-user offline snapshot and sync queue files.
    pub offline_root: PathBuf,
    pub avatar_root: PathBuf,
    /// Base URL used for avatar links and password reset links.
    pub public_base_url: Url,
    pub cookie_secret: String,
    pub travelers: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://planner.db?mode=rwc".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let itinerary_dir = env::var("ITINERARY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("doc/itineraires/standardized"));

        let offline_root = env::var("OFFLINE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("offline"));

        let avatar_root = env::var("AVATAR_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("avatars"));

        let public_base_url = parse_base_url(
            &env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000/".to_string()),
        )?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-world-cup-planner-cookie-secret".to_string());

        let travelers = match env::var("TRIP_TRAVELERS") {
            Ok(raw) => raw
                .parse()
                .map_err(|err| AppError::Config(format!("invalid TRIP_TRAVELERS: {err}")))?,
            Err(_) => 6,
        };

        Ok(Self {
            database_url,
            listen_addr,
            itinerary_dir,
            offline_root,
            avatar_root,
            public_base_url,
            cookie_secret,
            travelers,
        })
    }
}

/// Parses a base URL and makes sure it ends with a slash so `Url::join`
/// appends instead of replacing the last segment.
pub fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized)
        .map_err(|err| AppError::Config(format!("invalid PUBLIC_BASE_URL: {err}")))
}
