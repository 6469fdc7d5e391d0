//! Live vehicle positions interpolated from schedules.
//!
//! Both entry points are pure functions of (routes, wall-clock minutes,
//! day type): a schedule is in service when its day type matches and
//! the query time falls inside its first/last arrival window, and the
//! vehicle position is interpolated between the stop-times bracketing
//! the query time. The chord variant interpolates straight between stop
//! geometries; the path variant follows the route polyline between the
//! snapped stop vertices, which is what the map renderer wants on curvy
//! streets.

use geo::Point;
use log::trace;

use crate::geodesy::{geodetic_to_tile_pixel, haversine_m};
use crate::model::{DayType, Route, RouteKey, Schedule};
use crate::relations::nearest_vertex;

/// Compass sector for sprite selection, 45° each.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heading {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Heading {
    /// Quantizes a screen-space direction vector (y grows downward)
    /// into one of 8 sectors centered on the compass directions. A zero
    /// vector maps to north.
    pub fn from_screen_vector(dx: f64, dy: f64) -> Self {
        const SECTORS: [Heading; 8] = [
            Heading::North,
            Heading::NorthEast,
            Heading::East,
            Heading::SouthEast,
            Heading::South,
            Heading::SouthWest,
            Heading::West,
            Heading::NorthWest,
        ];
        if dx == 0.0 && dy == 0.0 {
            return Heading::North;
        }
        // 0° = up the screen, growing clockwise.
        let deg = (dx.atan2(-dy).to_degrees() + 360.0) % 360.0;
        SECTORS[(((deg + 22.5) / 45.0).floor() as usize) % 8]
    }
}

/// One vehicle currently in service. Ephemeral: recomputed per query,
/// never persisted.
#[derive(Clone, Debug)]
pub struct ActiveVehicle {
    pub route: RouteKey,
    pub schedule_id: u32,
    pub position: Point<f64>,
    /// Overall trip completion in [0, 1].
    pub progress: f64,
    pub waiting_at_stop: bool,
    /// Sequence indices of the bracketing stop-times.
    pub current_stop: usize,
    pub next_stop: usize,
    /// Completion of the current leg in [0, 1].
    pub segment_progress: f64,
    /// Geometry of the next stop, for heading derivation.
    pub next_position: Point<f64>,
}

impl ActiveVehicle {
    /// Heading toward the next stop in screen space at the given camera.
    pub fn heading(&self, tile_origin: (f64, f64), zoom: u8) -> Heading {
        let (px, py) = geodetic_to_tile_pixel(self.position, tile_origin, zoom);
        let (nx, ny) = geodetic_to_tile_pixel(self.next_position, tile_origin, zoom);
        Heading::from_screen_vector(nx - px, ny - py)
    }
}

/// All vehicles in service at `time_min`, positions interpolated on the
/// straight chord between the bracketing stops.
pub fn active_vehicles(routes: &[Route], time_min: f64, day_type: DayType) -> Vec<ActiveVehicle> {
    collect_vehicles(routes, time_min, day_type, false)
}

/// Like [`active_vehicles`], but positions follow the route polyline
/// between the stops' snapped path vertices. Falls back to the chord
/// when the snap window is empty or degenerate.
pub fn active_vehicles_on_path(
    routes: &[Route],
    time_min: f64,
    day_type: DayType,
) -> Vec<ActiveVehicle> {
    collect_vehicles(routes, time_min, day_type, true)
}

fn collect_vehicles(
    routes: &[Route],
    time_min: f64,
    day_type: DayType,
    follow_path: bool,
) -> Vec<ActiveVehicle> {
    routes
        .iter()
        .flat_map(|route| {
            route
                .schedules
                .iter()
                .filter(|schedule| schedule.day_type == day_type)
                .filter_map(move |schedule| {
                    vehicle_for_schedule(route, schedule, time_min, follow_path)
                })
        })
        .collect()
}

fn vehicle_for_schedule(
    route: &Route,
    schedule: &Schedule,
    time_min: f64,
    follow_path: bool,
) -> Option<ActiveVehicle> {
    let stop_times = &schedule.stop_times;
    let first = stop_times.first()?;
    let last = stop_times.last()?;

    // In-service window is inclusive on both ends.
    if time_min < f64::from(first.arrival) || time_min > f64::from(last.arrival) {
        return None;
    }

    // First stop-time the vehicle has not yet passed; the window gate
    // guarantees a match, and index 0 means the trip has yet to depart.
    let next_idx = stop_times
        .iter()
        .position(|st| f64::from(st.arrival) >= time_min)?;
    let total = stop_times.len() as f64;

    if next_idx == 0 {
        // Not yet departed: waiting at the first stop.
        let position = lookup_stop(route, stop_times[0].stop_id)?;
        return Some(ActiveVehicle {
            route: route.key,
            schedule_id: schedule.schedule_id,
            position,
            progress: f64::from(stop_times[0].sequence) / total,
            waiting_at_stop: true,
            current_stop: 0,
            next_stop: 0,
            segment_progress: 0.0,
            next_position: position,
        });
    }

    let prev = &stop_times[next_idx - 1];
    let next = &stop_times[next_idx];
    let prev_geo = lookup_stop(route, prev.stop_id)?;
    let next_geo = lookup_stop(route, next.stop_id)?;

    let span = f64::from(next.arrival) - f64::from(prev.arrival);
    let segment_progress = if span <= 0.0 {
        0.0
    } else {
        ((time_min - f64::from(prev.arrival)) / span).clamp(0.0, 1.0)
    };

    let position = if follow_path {
        position_along_path(&route.path, prev_geo, next_geo, segment_progress)
    } else {
        lerp(prev_geo, next_geo, segment_progress)
    };

    Some(ActiveVehicle {
        route: route.key,
        schedule_id: schedule.schedule_id,
        position,
        progress: (f64::from(prev.sequence) + segment_progress) / total,
        waiting_at_stop: false,
        current_stop: next_idx - 1,
        next_stop: next_idx,
        segment_progress,
        next_position: next_geo,
    })
}

fn lookup_stop(route: &Route, stop_id: u32) -> Option<Point<f64>> {
    let geometry = route.stop_geometry(stop_id);
    if geometry.is_none() {
        trace!(
            "Stop {stop_id} referenced by a schedule is not on route {}/{} dir {}",
            route.key.line_id, route.key.variant_id, route.key.direction
        );
    }
    geometry
}

fn lerp(from: Point<f64>, to: Point<f64>, t: f64) -> Point<f64> {
    Point::new(
        from.x() + (to.x() - from.x()) * t,
        from.y() + (to.y() - from.y()) * t,
    )
}

/// Interpolates along the route polyline between the path vertices
/// nearest to `from` and `to`, by fraction of accumulated path length.
fn position_along_path(path: &[Point<f64>], from: Point<f64>, to: Point<f64>, t: f64) -> Point<f64> {
    let Some((start, _)) = nearest_vertex(path, from) else {
        return lerp(from, to, t);
    };
    let Some((end, _)) = nearest_vertex(path, to) else {
        return lerp(from, to, t);
    };
    if start >= end {
        return lerp(from, to, t);
    }

    let total: f64 = (start..end)
        .map(|idx| haversine_m(path[idx], path[idx + 1]))
        .sum();
    if total <= 0.0 {
        return lerp(from, to, t);
    }

    let mut remaining = t * total;
    for idx in start..end {
        let len = haversine_m(path[idx], path[idx + 1]);
        if remaining <= len {
            let within = if len > 0.0 { remaining / len } else { 0.0 };
            return lerp(path[idx], path[idx + 1], within);
        }
        remaining -= len;
    }
    path[end]
}
