pub mod activity;
pub mod dashboard;
pub mod itinerary;
pub mod profile;
pub mod session;
pub mod standardized;
pub mod sync;
pub mod trip;
pub mod user;
