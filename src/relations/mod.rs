//! Spatial join between route polylines and stops.
//!
//! Membership is a proximity test: a stop belongs to a route when any
//! vertex of the route's path lies within the threshold great-circle
//! distance of the stop. The scan is O(routes x stops x path length),
//! which is fine for survey datasets of a few hundred records; routes
//! are processed in parallel and merged back in input order so the
//! result never depends on scheduling or hash iteration order.

use std::sync::Arc;

use geo::Point;
use log::debug;
use rayon::prelude::*;

use crate::geodesy::haversine_m;
use crate::model::{Route, RouteKey, Stop};

/// Joins stops onto routes and orders each route's stops along its path.
///
/// Returns a new generation of both collections: every stop carries its
/// sorted, deduplicated route memberships, every route carries its
/// member stops sorted by snapped path-vertex index (ties broken by the
/// stop's original input position). Routes with empty paths and stops
/// near no route degrade to empty relationships.
pub fn build_relationships(
    routes: Vec<Route>,
    stops: Vec<Arc<Stop>>,
    threshold_m: f64,
) -> (Vec<Route>, Vec<Arc<Stop>>) {
    // Per route: (snapped vertex index, stop input index) for every
    // stop within the threshold, ordered along the path.
    let matches: Vec<Vec<(usize, usize)>> = routes
        .par_iter()
        .map(|route| {
            let mut matched = Vec::new();
            for (stop_idx, stop) in stops.iter().enumerate() {
                if let Some((vertex, dist)) = nearest_vertex(&route.path, stop.geometry) {
                    if dist <= threshold_m {
                        matched.push((vertex, stop_idx));
                    }
                }
            }
            matched.sort_unstable();
            matched
        })
        .collect();

    // Aggregate route memberships per stop, scanning routes in input order.
    let mut memberships: Vec<Vec<RouteKey>> = vec![Vec::new(); stops.len()];
    for (route, matched) in routes.iter().zip(&matches) {
        if matched.is_empty() {
            debug!(
                "Route {}/{} dir {} has no stops within {threshold_m} m",
                route.key.line_id, route.key.variant_id, route.key.direction
            );
        }
        for &(_, stop_idx) in matched {
            memberships[stop_idx].push(route.key);
        }
    }

    let new_stops: Vec<Arc<Stop>> = stops
        .iter()
        .zip(memberships)
        .map(|(stop, mut keys)| {
            keys.sort_unstable();
            keys.dedup();
            Arc::new(Stop {
                route_ids: keys,
                ..(**stop).clone()
            })
        })
        .collect();

    let new_routes = routes
        .into_iter()
        .zip(matches)
        .map(|(route, matched)| Route {
            stops: matched
                .iter()
                .map(|&(_, stop_idx)| Arc::clone(&new_stops[stop_idx]))
                .collect(),
            ..route
        })
        .collect();

    (new_routes, new_stops)
}

/// Index of the path vertex nearest to `target` and its distance in
/// meters. Strict comparison keeps the first vertex on exact ties,
/// scanning front-to-back.
pub(crate) fn nearest_vertex(path: &[Point<f64>], target: Point<f64>) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, vertex) in path.iter().enumerate() {
        let dist = haversine_m(*vertex, target);
        if best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((idx, dist));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn stop(id: u32, lng: f64, lat: f64) -> Arc<Stop> {
        Arc::new(Stop {
            id,
            external_id: format!("EXT-{id}"),
            name: format!("Stop {id}"),
            source: Coord { x: 0.0, y: 0.0 },
            geometry: Point::new(lng, lat),
            route_ids: Vec::new(),
        })
    }

    fn route(line_id: u32, path: Vec<Point<f64>>) -> Route {
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
            path,
            source_path: Vec::new(),
            stops: Vec::new(),
            schedules: Vec::new(),
        }
    }

    // ~0.001 degrees of latitude is ~111 m.
    fn test_path() -> Vec<Point<f64>> {
        vec![
            Point::new(15.64, 46.55),
            Point::new(15.64, 46.56),
            Point::new(15.64, 46.57),
            Point::new(15.64, 46.58),
        ]
    }

    #[test]
    fn assigned_stops_are_within_threshold_and_others_are_not() {
        let routes = vec![route(6, test_path())];
        // Scrambled input order relative to path position.
        let stops = vec![
            stop(3, 15.6401, 46.57),
            stop(1, 15.6401, 46.55),
            stop(2, 15.6401, 46.56),
            stop(9, 15.7, 46.9), // far away
        ];

        let (routes, stops) = build_relationships(routes, stops, 100.0);

        let member_ids: Vec<u32> = routes[0].stops.iter().map(|s| s.id).collect();
        assert_eq!(member_ids, vec![1, 2, 3]);

        for member in &routes[0].stops {
            let (_, dist) = nearest_vertex(&routes[0].path, member.geometry).unwrap();
            assert!(dist <= 100.0);
        }
        assert!(stops[3].route_ids.is_empty());
    }

    #[test]
    fn route_stops_ordered_by_snapped_vertex_index() {
        let routes = vec![route(6, test_path())];
        let stops = vec![
            stop(30, 15.6401, 46.58),
            stop(10, 15.6401, 46.55),
            stop(20, 15.6401, 46.5602), // snaps just past vertex 1
        ];

        let (routes, _) = build_relationships(routes, stops, 200.0);

        let mut last_vertex = 0usize;
        for member in &routes[0].stops {
            let (vertex, _) = nearest_vertex(&routes[0].path, member.geometry).unwrap();
            assert!(vertex >= last_vertex, "snapped indices must not decrease");
            last_vertex = vertex;
        }
        assert_eq!(routes[0].stops.first().unwrap().id, 10);
        assert_eq!(routes[0].stops.last().unwrap().id, 30);
    }

    #[test]
    fn stop_memberships_are_sorted_and_deduplicated() {
        let routes = vec![route(21, test_path()), route(6, test_path())];
        let stops = vec![stop(1, 15.6401, 46.56)];

        let (_, stops) = build_relationships(routes, stops, 100.0);

        let lines: Vec<u32> = stops[0].route_ids.iter().map(|k| k.line_id).collect();
        assert_eq!(lines, vec![6, 21]);
    }

    #[test]
    fn deterministic_across_runs() {
        let make = || {
            let routes = vec![route(6, test_path()), route(21, test_path())];
            let stops = vec![
                stop(1, 15.6401, 46.55),
                stop(2, 15.6401, 46.56),
                stop(3, 15.6401, 46.57),
            ];
            build_relationships(routes, stops, 150.0)
        };

        let (routes_a, stops_a) = make();
        let (routes_b, stops_b) = make();

        for (a, b) in routes_a.iter().zip(&routes_b) {
            let ids_a: Vec<u32> = a.stops.iter().map(|s| s.id).collect();
            let ids_b: Vec<u32> = b.stops.iter().map(|s| s.id).collect();
            assert_eq!(ids_a, ids_b);
        }
        for (a, b) in stops_a.iter().zip(&stops_b) {
            assert_eq!(a.route_ids, b.route_ids);
        }
    }

    #[test]
    fn empty_path_degrades_to_empty_relationship() {
        let routes = vec![route(6, Vec::new())];
        let stops = vec![stop(1, 15.64, 46.55)];

        let (routes, stops) = build_relationships(routes, stops, 100.0);
        assert!(routes[0].stops.is_empty());
        assert!(stops[0].route_ids.is_empty());
    }

    #[test]
    fn coincident_stops_both_join_in_input_order() {
        let routes = vec![route(6, test_path())];
        let stops = vec![stop(7, 15.64, 46.56), stop(4, 15.64, 46.56)];

        let (routes, _) = build_relationships(routes, stops, 100.0);
        let ids: Vec<u32> = routes[0].stops.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![7, 4]);
    }
}
