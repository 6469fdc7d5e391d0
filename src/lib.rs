//! Core model for a municipal transit map.
//!
//! Turns raw survey data (stops in a local projected datum, route
//! polylines, optional timetables) into an immutable, queryable transit
//! snapshot: geodetic stop/route geometry, ordered route-to-stop
//! relationships, per-line schedules, interpolated live vehicle
//! positions and zoom-dependent marker clustering.
//!
//! Every pipeline stage consumes an immutable generation of the model
//! and returns a new one; the only mutable state is the cluster
//! animation list, which is owned by a single presentation loop. The
//! crate performs no rendering and, apart from the file loaders, no I/O.

pub mod cluster;
pub mod error;
pub mod geodesy;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod relations;
pub mod schedule;
pub mod vehicles;

pub use error::Error;
pub use model::{DayType, Route, RouteKey, Schedule, Stop, StopTime, TransitModel};

/// Minutes since midnight, the canonical time unit for all schedule fields.
pub type Minutes = u32;

/// Length of the service day in minutes.
pub const MINUTES_PER_DAY: Minutes = 1440;

/// Mean Earth radius used for all great-circle distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
