use std::sync::Arc;

use geo::{Coord, Point};

use crate::Minutes;

/// Classification of a calendar day, selecting which schedule variant applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DayType {
    Workday = 0,
    Saturday = 1,
    Sunday = 2,
}

impl DayType {
    pub fn from_weekday(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
            _ => Self::Workday,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Workday),
            1 => Some(Self::Saturday),
            2 => Some(Self::Sunday),
            _ => None,
        }
    }
}

/// Route identity triple. Two survey records describing the same line,
/// variant and direction describe the same route.
///
/// `Ord` so that aggregations over route keys sort deterministically
/// instead of depending on hash-map iteration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub line_id: u32,
    pub variant_id: u32,
    /// +1 / -1 in the survey data.
    pub direction: i8,
}

/// A transit stop. Immutable after the spatial join has written its
/// route memberships; shared between the snapshot stop list and every
/// route that serves it via `Arc`.
#[derive(Clone, Debug)]
pub struct Stop {
    pub id: u32,
    pub external_id: String,
    pub name: String,
    /// Original local-datum coordinate, kept for provenance.
    pub source: Coord<f64>,
    /// WGS84 position (x = lng, y = lat).
    pub geometry: Point<f64>,
    /// Keys of the routes serving this stop, sorted and deduplicated.
    pub route_ids: Vec<RouteKey>,
}

/// Arrival of one trip at one stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StopTime {
    pub stop_id: u32,
    pub sequence: u32,
    pub arrival: Minutes,
}

/// One scheduled run of a vehicle along a route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub schedule_id: u32,
    pub route: RouteKey,
    pub day_type: DayType,
    pub departure: Minutes,
    /// Ordered by `sequence` and by non-decreasing `arrival`.
    pub stop_times: Vec<StopTime>,
}

/// A route variant in one direction of travel.
#[derive(Clone, Debug)]
pub struct Route {
    pub key: RouteKey,
    pub length_m: f64,
    pub name: String,
    pub note: String,
    pub provider_name: String,
    pub provider_link: String,
    /// WGS84 polyline.
    pub path: Vec<Point<f64>>,
    /// Original local-datum polyline, kept for provenance.
    pub source_path: Vec<Coord<f64>>,
    /// Member stops, ordered by their snapped position along `path`.
    pub stops: Vec<Arc<Stop>>,
    pub schedules: Vec<Schedule>,
}

impl Route {
    /// Geometry of a member stop by id, if the stop is on this route.
    pub fn stop_geometry(&self, stop_id: u32) -> Option<Point<f64>> {
        self.stops
            .iter()
            .find(|stop| stop.id == stop_id)
            .map(|stop| stop.geometry)
    }
}
