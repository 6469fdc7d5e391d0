//! Attaching schedules to their routes.

use itertools::Itertools;

use crate::model::{Route, Schedule};

/// Groups schedules by route identity and attaches them, producing a
/// new route generation. Routes with no matching schedules get an empty
/// schedule list.
pub fn assign_schedules(routes: Vec<Route>, schedules: Vec<Schedule>) -> Vec<Route> {
    let mut by_route = schedules
        .into_iter()
        .map(|schedule| (schedule.route, schedule))
        .into_group_map();

    routes
        .into_iter()
        .map(|route| {
            let schedules = by_route.remove(&route.key).unwrap_or_default();
            Route { schedules, ..route }
        })
        .collect()
}
