//! Data model for the transit snapshot.
//!
//! Contains the immutable value types every pipeline stage consumes
//! and produces.

pub mod snapshot;
pub mod types;

pub use snapshot::TransitModel;
pub use types::{DayType, Route, RouteKey, Schedule, Stop, StopTime};
