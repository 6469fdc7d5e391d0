use std::path::PathBuf;

use crate::model::DayType;

/// Configuration for building a transit model from survey files.
#[derive(Debug, Clone)]
pub struct TransitModelConfig {
    /// CSV point-feature table, one record per stop.
    pub stops_path: PathBuf,
    /// JSON line-feature collection, one record per route variant/direction.
    pub routes_path: PathBuf,
    /// Optional explicit timetable; when absent or empty, schedules are
    /// synthesized from route geometry.
    pub timetable_path: Option<PathBuf>,
    /// Great-circle distance within which a stop joins a route, meters.
    pub proximity_threshold_m: f64,
    /// Day type tag for synthesized schedules.
    pub synth_day_type: DayType,
    /// Seed for the synthesizer's dwell jitter.
    pub synth_seed: u64,
}

impl TransitModelConfig {
    pub fn new(stops_path: impl Into<PathBuf>, routes_path: impl Into<PathBuf>) -> Self {
        Self {
            stops_path: stops_path.into(),
            routes_path: routes_path.into(),
            timetable_path: None,
            proximity_threshold_m: 100.0,
            synth_day_type: DayType::Workday,
            synth_seed: 0,
        }
    }
}
