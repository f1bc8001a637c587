pub mod public;
pub mod trips;
pub mod user;

use axum::Router;
use chrono::NaiveDate;
use tower_http::services::ServeDir;

use crate::{error::AppError, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let avatars = ServeDir::new(state.config.avatar_root.clone());
    Router::new()
        .merge(public::router())
        .nest("/me", user::router().merge(trips::router()))
        .nest_service("/avatars", avatars)
        .with_state(state)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid date: {raw}, expected YYYY-MM-DD")))
}
