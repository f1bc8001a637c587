pub mod activities;
pub mod dashboard;
pub mod days;
pub mod import;
pub mod itinerary;
pub mod itinerary_files;
pub mod profiles;
pub mod storage;
pub mod sync;
pub mod trips;
