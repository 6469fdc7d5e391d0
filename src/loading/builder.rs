use log::info;

use super::config::TransitModelConfig;
use super::survey::{load_survey_routes, load_survey_stops};
use super::timetable::load_timetable;
use crate::Error;
use crate::model::TransitModel;
use crate::relations::build_relationships;
use crate::schedule::{assign_schedules, generate_schedules};

/// Builds a complete transit snapshot from the configured survey files.
///
/// The stages run as a functional pipeline: each takes the previous
/// generation of the model and returns a new one, so the returned
/// snapshot is fully built before anyone can observe it. Individual
/// malformed records inside the inputs are skipped by the loaders;
/// only unreadable files abort the build.
///
/// # Errors
///
/// Returns an error if a configured input file cannot be read or its
/// top-level document cannot be parsed.
pub fn create_transit_model(config: &TransitModelConfig) -> Result<TransitModel, Error> {
    validate_config(config)?;

    info!("Loading survey stops: {}", config.stops_path.display());
    let stops = load_survey_stops(&config.stops_path)?;

    info!("Loading survey routes: {}", config.routes_path.display());
    let routes = load_survey_routes(&config.routes_path)?;
    info!("Loaded {} stops and {} route variants", stops.len(), routes.len());

    let (routes, stops) =
        build_relationships(routes, stops, config.proximity_threshold_m);

    let schedules = match &config.timetable_path {
        Some(path) => load_timetable(path)?,
        None => Vec::new(),
    };
    let schedules = if schedules.is_empty() {
        info!(
            "No explicit timetable - synthesizing {:?} schedules",
            config.synth_day_type
        );
        generate_schedules(&routes, config.synth_day_type, config.synth_seed)
    } else {
        info!("Loaded {} explicit schedules", schedules.len());
        schedules
    };

    let routes = assign_schedules(routes, schedules);

    let model = TransitModel { routes, stops };
    info!(
        "Transit model ready: {} routes, {} stops, {} schedules",
        model.routes.len(),
        model.stops.len(),
        model.schedule_count()
    );
    Ok(model)
}

fn validate_config(config: &TransitModelConfig) -> Result<(), Error> {
    if !config.stops_path.exists() {
        return Err(Error::InvalidData(format!(
            "Stop table not found: {}",
            config.stops_path.display()
        )));
    }
    if !config.routes_path.exists() {
        return Err(Error::InvalidData(format!(
            "Route collection not found: {}",
            config.routes_path.display()
        )));
    }
    if config.proximity_threshold_m <= 0.0 {
        return Err(Error::InvalidData(format!(
            "Proximity threshold must be positive, got {}",
            config.proximity_threshold_m
        )));
    }
    Ok(())
}
