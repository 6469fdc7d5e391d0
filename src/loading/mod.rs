//! Loading raw survey data and building the transit snapshot.

mod builder;
mod config;
pub mod survey;
pub mod timetable;

pub use builder::create_transit_model;
pub use config::TransitModelConfig;
pub use timetable::parse_timetable;
