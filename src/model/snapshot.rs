//! Immutable transit snapshot and query helpers.

use std::sync::Arc;

use super::types::{Route, RouteKey, Stop};

/// Complete transit model for one generation of the pipeline.
///
/// Snapshots are cheap to clone (stops are shared `Arc`s) and are meant
/// to be published wholesale to a consumer: a reader always sees either
/// the previous snapshot or a fully built new one, never a partially
/// populated model.
#[derive(Clone, Debug, Default)]
pub struct TransitModel {
    pub routes: Vec<Route>,
    pub stops: Vec<Arc<Stop>>,
}

impl TransitModel {
    pub fn route(&self, key: RouteKey) -> Option<&Route> {
        self.routes.iter().find(|route| route.key == key)
    }

    pub fn stop(&self, stop_id: u32) -> Option<&Arc<Stop>> {
        self.stops.iter().find(|stop| stop.id == stop_id)
    }

    /// All route variants of one line, both directions.
    pub fn line_routes(&self, line_id: u32) -> impl Iterator<Item = &Route> {
        self.routes
            .iter()
            .filter(move |route| route.key.line_id == line_id)
    }

    pub fn schedule_count(&self) -> usize {
        self.routes.iter().map(|route| route.schedules.len()).sum()
    }
}
