//! Timetable synthesis from route geometry.
//!
//! Used when the survey ships no explicit timetable. Per route the
//! synthesizer filters near-duplicate stops out of the ordered stop
//! list, classifies the line as urban or suburban, and emits trips for
//! a small fixed vehicle pool over the whole service day. Leg times
//! come from great-circle distance at a nominal cruising speed, with
//! floors for very short hops; the short-hop dwell jitter is drawn from
//! a per-route seeded ChaCha stream, so identical inputs and seed give
//! byte-identical output.

use std::sync::Arc;

use log::debug;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::geodesy::haversine_m;
use crate::model::{DayType, Route, RouteKey, Schedule, Stop, StopTime};
use crate::{MINUTES_PER_DAY, Minutes};

/// Minimum planar spacing between scheduled stops, in degrees (~300 m).
const MIN_STOP_SPACING_DEG: f64 = 0.003;
/// Nominal cruising speed between stops.
const TRAVEL_SPEED_KMH: f64 = 50.0;
/// Lines below this id are urban; everything else is suburban.
const URBAN_LINE_LIMIT: u32 = 100;
/// Minutes between consecutive trips of one route.
const URBAN_TRIP_INTERVAL: Minutes = 15;
const SUBURBAN_TRIP_INTERVAL: Minutes = 30;
/// Fixed vehicle pool per route, start times offset evenly.
const VEHICLES_PER_ROUTE: u32 = 2;

/// Synthesizes a full service day of schedules for every route that has
/// assigned stops. All output is tagged with the given day type.
pub fn generate_schedules(routes: &[Route], day_type: DayType, seed: u64) -> Vec<Schedule> {
    let mut schedules = Vec::new();
    let mut next_id: u32 = 0;

    for route in routes {
        if route.stops.is_empty() {
            debug!(
                "Skipping schedule synthesis for stop-less route {}/{} dir {}",
                route.key.line_id, route.key.variant_id, route.key.direction
            );
            continue;
        }

        let scheduled = scheduled_stops(&route.stops);
        if scheduled.is_empty() {
            continue;
        }

        let urban = route.key.line_id < URBAN_LINE_LIMIT;
        let interval = if urban {
            URBAN_TRIP_INTERVAL
        } else {
            SUBURBAN_TRIP_INTERVAL
        };
        let stop_count = scheduled.len() as f64;
        let duration_min = if urban {
            5.0 + 1.5 * stop_count
        } else {
            8.0 + 2.0 * stop_count
        };
        let duration = duration_min.ceil() as Minutes;

        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ route_seed(route.key));
        let legs = leg_minutes(&scheduled, &mut rng);

        for vehicle in 0..VEHICLES_PER_ROUTE {
            let mut departure = vehicle * interval / VEHICLES_PER_ROUTE;
            while departure + duration <= MINUTES_PER_DAY {
                schedules.push(build_trip(
                    next_id, route.key, day_type, departure, &scheduled, &legs,
                ));
                next_id += 1;
                departure += interval;
            }
        }
    }

    schedules
}

/// Filters the route's ordered stops down to the scheduled subset: a
/// stop is kept only if its planar degree-space distance to every
/// already-kept stop exceeds the minimum spacing.
fn scheduled_stops(stops: &[Arc<Stop>]) -> Vec<Arc<Stop>> {
    let mut kept: Vec<Arc<Stop>> = Vec::with_capacity(stops.len());
    for stop in stops {
        let spaced = kept.iter().all(|prev| {
            let dx = stop.geometry.x() - prev.geometry.x();
            let dy = stop.geometry.y() - prev.geometry.y();
            (dx * dx + dy * dy).sqrt() > MIN_STOP_SPACING_DEG
        });
        if spaced {
            kept.push(Arc::clone(stop));
        }
    }
    kept
}

/// Minutes of travel for each leg between consecutive scheduled stops.
fn leg_minutes(stops: &[Arc<Stop>], rng: &mut ChaCha8Rng) -> Vec<f64> {
    stops
        .windows(2)
        .map(|pair| {
            let km = haversine_m(pair[0].geometry, pair[1].geometry) / 1000.0;
            let travel = km / TRAVEL_SPEED_KMH * 60.0;
            let floor = if km < 1.0 {
                rng.gen_range(0.5..0.7)
            } else if km < 1.5 {
                0.5
            } else {
                1.0
            };
            travel.max(floor)
        })
        .collect()
}

fn build_trip(
    schedule_id: u32,
    route: RouteKey,
    day_type: DayType,
    departure: Minutes,
    stops: &[Arc<Stop>],
    legs: &[f64],
) -> Schedule {
    let mut elapsed = 0.0_f64;
    let stop_times = stops
        .iter()
        .enumerate()
        .map(|(idx, stop)| {
            if idx > 0 {
                elapsed += legs[idx - 1];
            }
            StopTime {
                stop_id: stop.id,
                sequence: idx as u32,
                arrival: departure + elapsed.round() as Minutes,
            }
        })
        .collect();

    Schedule {
        schedule_id,
        route,
        day_type,
        departure,
        stop_times,
    }
}

fn route_seed(key: RouteKey) -> u64 {
    (u64::from(key.line_id) << 40) | (u64::from(key.variant_id) << 8) | u64::from(key.direction as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, Point};

    fn stop(id: u32, lng: f64, lat: f64) -> Arc<Stop> {
        Arc::new(Stop {
            id,
            external_id: String::new(),
            name: format!("Stop {id}"),
            source: Coord { x: 0.0, y: 0.0 },
            geometry: Point::new(lng, lat),
            route_ids: Vec::new(),
        })
    }

    fn route(line_id: u32, stops: Vec<Arc<Stop>>) -> Route {
        Route {
            key: RouteKey {
                line_id,
                variant_id: 1,
                direction: 1,
            },
            length_m: 0.0,
            name: format!("Line {line_id}"),
            note: String::new(),
            provider_name: String::new(),
            provider_link: String::new(),
            path: Vec::new(),
            source_path: Vec::new(),
            stops,
            schedules: Vec::new(),
        }
    }

    fn spaced_stops() -> Vec<Arc<Stop>> {
        vec![
            stop(1, 15.64, 46.55),
            stop(2, 15.64, 46.56),
            stop(3, 15.64, 46.57),
        ]
    }

    #[test]
    fn byte_identical_for_same_seed() {
        let routes = vec![route(6, spaced_stops()), route(160, spaced_stops())];
        let a = generate_schedules(&routes, DayType::Workday, 42);
        let b = generate_schedules(&routes, DayType::Workday, 42);
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn stop_less_routes_are_skipped() {
        let routes = vec![route(6, Vec::new())];
        assert!(generate_schedules(&routes, DayType::Workday, 0).is_empty());
    }

    #[test]
    fn near_duplicate_stops_are_filtered() {
        // Second stop is ~0.001 degrees from the first, below spacing.
        let routes = vec![route(6, vec![
            stop(1, 15.64, 46.55),
            stop(2, 15.64, 46.551),
            stop(3, 15.64, 46.56),
        ])];
        let schedules = generate_schedules(&routes, DayType::Sunday, 0);
        let ids: Vec<u32> = schedules[0].stop_times.iter().map(|st| st.stop_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn tagged_with_requested_day_type() {
        let routes = vec![route(6, spaced_stops())];
        let schedules = generate_schedules(&routes, DayType::Saturday, 0);
        assert!(schedules.iter().all(|s| s.day_type == DayType::Saturday));
    }

    #[test]
    fn suburban_interval_is_doubled() {
        let urban = generate_schedules(&[route(6, spaced_stops())], DayType::Workday, 0);
        let suburban = generate_schedules(&[route(160, spaced_stops())], DayType::Workday, 0);
        // Same service day, half the trips for the doubled interval
        // (the longer suburban duration trims a few more off the tail).
        assert!(suburban.len() < urban.len());
        assert!(suburban.len() >= urban.len() / 3);
    }

    #[test]
    fn second_vehicle_offset_by_half_interval() {
        let schedules = generate_schedules(&[route(6, spaced_stops())], DayType::Workday, 0);
        let mut departures: Vec<Minutes> = schedules.iter().map(|s| s.departure).collect();
        departures.sort_unstable();
        departures.dedup();
        assert_eq!(departures[0], 0);
        assert_eq!(departures[1], URBAN_TRIP_INTERVAL / 2);
    }

    #[test]
    fn arrivals_are_non_decreasing_and_within_the_day() {
        let schedules = generate_schedules(&[route(6, spaced_stops())], DayType::Workday, 7);
        for schedule in &schedules {
            let mut last = schedule.departure;
            for (idx, st) in schedule.stop_times.iter().enumerate() {
                assert_eq!(st.sequence, idx as u32);
                assert!(st.arrival >= last);
                last = st.arrival;
            }
            assert!(last < MINUTES_PER_DAY + 60, "trip runs far past midnight");
        }
    }
}
