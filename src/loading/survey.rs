//! Raw survey feature records and their conversion to model types.
//!
//! Stops arrive as a CSV point-feature table, routes as a JSON
//! line-feature collection; both carry coordinates in the local
//! projected datum. A malformed individual record is skipped with a
//! warning and never aborts the batch.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use geo::Coord;
use log::warn;
use serde::Deserialize;

use crate::Error;
use crate::geodesy::projected_to_geodetic;
use crate::model::{Route, RouteKey, Stop};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SurveyStopRecord {
    pub id: String,
    pub external_id: String,
    pub name: String,
    pub x: String,
    pub y: String,
}

#[derive(Debug, Deserialize)]
pub struct SurveyRouteRecord {
    pub line_id: u32,
    pub variant_id: u32,
    pub direction: i8,
    #[serde(default)]
    pub length_m: f64,
    pub name: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub provider_link: String,
    /// Local-datum (x, y) pairs.
    pub path: Vec<[f64; 2]>,
}

pub fn load_survey_stops(path: &Path) -> Result<Vec<Arc<Stop>>, Error> {
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open stop table '{}': {}", path.display(), e),
        )
    })?;
    parse_survey_stops(file)
}

pub fn parse_survey_stops<R: Read>(reader: R) -> Result<Vec<Arc<Stop>>, Error> {
    let mut stops = Vec::new();
    for result in csv::Reader::from_reader(reader).deserialize::<SurveyStopRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable stop record: {e}");
                continue;
            }
        };
        if let Some(stop) = stop_from_record(record) {
            stops.push(Arc::new(stop));
        }
    }
    Ok(stops)
}

fn stop_from_record(record: SurveyStopRecord) -> Option<Stop> {
    let id = match record.id.trim().parse::<u32>() {
        Ok(id) => id,
        Err(e) => {
            warn!("Skipping stop with invalid id '{}': {e}", record.id);
            return None;
        }
    };
    let (x, y) = match (record.x.trim().parse::<f64>(), record.y.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => (x, y),
        _ => {
            warn!(
                "Skipping stop {id} with invalid coordinates ('{}', '{}')",
                record.x, record.y
            );
            return None;
        }
    };

    Some(Stop {
        id,
        external_id: record.external_id,
        name: record.name,
        source: Coord { x, y },
        geometry: projected_to_geodetic(x, y),
        route_ids: Vec::new(),
    })
}

pub fn load_survey_routes(path: &Path) -> Result<Vec<Route>, Error> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open route collection '{}': {}", path.display(), e),
        )
    })?;
    parse_survey_routes(&text)
}

/// Accepts either a bare JSON array of route records or an object with
/// a `routes` array; an absent collection yields an empty result.
pub fn parse_survey_routes(input: &str) -> Result<Vec<Route>, Error> {
    let document: serde_json::Value = serde_json::from_str(input)?;
    let records = match document {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("routes") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                log::info!("Route collection absent from survey document");
                Vec::new()
            }
        },
        _ => Vec::new(),
    };

    let mut routes = Vec::new();
    for item in records {
        match serde_json::from_value::<SurveyRouteRecord>(item) {
            Ok(record) => {
                if let Some(route) = route_from_record(record) {
                    routes.push(route);
                }
            }
            Err(e) => warn!("Skipping unreadable route record: {e}"),
        }
    }
    Ok(routes)
}

fn route_from_record(record: SurveyRouteRecord) -> Option<Route> {
    if record.direction != 1 && record.direction != -1 {
        warn!(
            "Skipping route {}/{} with invalid direction {}",
            record.line_id, record.variant_id, record.direction
        );
        return None;
    }

    let source_path: Vec<Coord<f64>> = record
        .path
        .iter()
        .map(|&[x, y]| Coord { x, y })
        .collect();
    let path = source_path
        .iter()
        .map(|c| projected_to_geodetic(c.x, c.y))
        .collect();

    Some(Route {
        key: RouteKey {
            line_id: record.line_id,
            variant_id: record.variant_id,
            direction: record.direction,
        },
        length_m: record.length_m,
        name: record.name,
        note: record.note,
        provider_name: record.provider_name,
        provider_link: record.provider_link,
        path,
        source_path,
        stops: Vec::new(),
        schedules: Vec::new(),
    })
}
