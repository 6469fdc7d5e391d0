//! Coordinate conversions between the survey datum, WGS84 and the
//! Web-Mercator pixel space used for on-screen placement.

mod transverse_mercator;
mod web_mercator;

pub use transverse_mercator::{geodetic_to_projected, projected_to_geodetic};
pub use web_mercator::{TILE_SIZE, geodetic_to_tile_pixel, tile_origin_pixels};

use geo::{Distance, HaversineMeasure, Point};

/// Great-circle distance in meters on the crate's fixed Earth radius.
pub fn haversine_m(a: Point<f64>, b: Point<f64>) -> f64 {
    HaversineMeasure::new(crate::EARTH_RADIUS_M).distance(a, b)
}
