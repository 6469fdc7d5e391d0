//! Web-Mercator forward projection into tile pixel space.

use std::f64::consts::PI;

use geo::Point;

/// Side length of a map tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Clamp for `sin(lat)` before the log term, keeping the projection
/// finite near the poles (±85.05° equivalent).
const SINY_CLAMP: f64 = 0.9999;

/// Pixel origin of a tile given its integer tile coordinates at some zoom.
pub fn tile_origin_pixels(tile_x: u32, tile_y: u32) -> (f64, f64) {
    (f64::from(tile_x) * TILE_SIZE, f64::from(tile_y) * TILE_SIZE)
}

/// Projects a WGS84 point (x = lng, y = lat) to pixel coordinates
/// relative to the given reference tile origin.
///
/// The world is `TILE_SIZE * 2^zoom` pixels wide; the y axis points
/// down, so larger latitudes map to smaller pixel rows. Pure math,
/// bit-reproducible for identical inputs.
pub fn geodetic_to_tile_pixel(
    point: Point<f64>,
    tile_origin: (f64, f64),
    zoom: u8,
) -> (f64, f64) {
    let scale = f64::from(1u32 << zoom);

    let siny = point.y().to_radians().sin().clamp(-SINY_CLAMP, SINY_CLAMP);

    let world_x = TILE_SIZE * (0.5 + point.x() / 360.0);
    let world_y = TILE_SIZE * (0.5 - ((1.0 + siny) / (1.0 - siny)).ln() / (4.0 * PI));

    (
        world_x * scale - tile_origin.0,
        world_y * scale - tile_origin.1,
    )
}
