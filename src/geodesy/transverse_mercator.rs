//! Gauss-Krüger transverse Mercator conversion for the survey datum.
//!
//! The source data uses the national Gauss-Krüger zone on the Bessel
//! 1841 ellipsoid (central meridian 15°E, scale 0.9999, false easting
//! 500 km, false northing -5000 km). One zone covers the whole dataset,
//! so there is no zone-selection logic. The closed-form Krüger series
//! below round-trips to sub-meter accuracy over the zone.
//!
//! Both directions are pure math with no failure modes: NaN or infinite
//! inputs flow through as NaN outputs.

use geo::{Coord, Point};

/// Bessel 1841 semi-major axis, meters.
const SEMI_MAJOR_AXIS: f64 = 6_377_397.155;
/// Bessel 1841 flattening.
const FLATTENING: f64 = 1.0 / 299.152_812_8;
/// Central meridian of the zone, degrees east.
const CENTRAL_MERIDIAN_DEG: f64 = 15.0;
/// Scale factor on the central meridian.
const SCALE: f64 = 0.9999;
/// False easting, meters.
const FALSE_EASTING: f64 = 500_000.0;
/// False northing, meters.
const FALSE_NORTHING: f64 = -5_000_000.0;

/// First eccentricity squared.
fn e2() -> f64 {
    FLATTENING * (2.0 - FLATTENING)
}

/// Second eccentricity squared.
fn ep2() -> f64 {
    let e2 = e2();
    e2 / (1.0 - e2)
}

/// Meridional arc length from the equator to latitude `phi` (radians).
fn meridian_arc(phi: f64) -> f64 {
    let e2 = e2();
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    SEMI_MAJOR_AXIS
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Inverse projection: local-datum (easting, northing) to WGS84-degree
/// latitude/longitude (returned as a point with x = lng, y = lat).
pub fn projected_to_geodetic(x: f64, y: f64) -> Point<f64> {
    let e2 = e2();
    let ep2 = ep2();
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    let m = (y - FALSE_NORTHING) / SCALE;
    let mu = m / (SEMI_MAJOR_AXIS * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    // Footpoint latitude
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = ep2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let n1 = SEMI_MAJOR_AXIS / (1.0 - e2 * sin_phi1 * sin_phi1).sqrt();
    let r1 = SEMI_MAJOR_AXIS * (1.0 - e2) / (1.0 - e2 * sin_phi1 * sin_phi1).powf(1.5);
    let d = (x - FALSE_EASTING) / (n1 * SCALE);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let phi = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lambda = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5 / 120.0)
        / cos_phi1;

    Point::new(
        CENTRAL_MERIDIAN_DEG + lambda.to_degrees(),
        phi.to_degrees(),
    )
}

/// Forward projection: WGS84-degree point (x = lng, y = lat) to the
/// local-datum (easting, northing).
pub fn geodetic_to_projected(point: Point<f64>) -> Coord<f64> {
    let e2 = e2();
    let ep2 = ep2();

    let phi = point.y().to_radians();
    let dlambda = (point.x() - CENTRAL_MERIDIAN_DEG).to_radians();

    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let tan_phi = phi.tan();

    let n = SEMI_MAJOR_AXIS / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let a = dlambda * cos_phi;

    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a3 * a;
    let a5 = a4 * a;
    let a6 = a5 * a;

    let easting = FALSE_EASTING
        + SCALE
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0);

    let northing = FALSE_NORTHING
        + SCALE
            * (meridian_arc(phi)
                + n * tan_phi
                    * (a2 / 2.0
                        + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

    Coord {
        x: easting,
        y: northing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_trips_survey_coordinates_within_a_meter() {
        // Eastings/northings spanning the populated part of the zone.
        let ground_truth = [
            (550_000.0, 150_000.0),
            (546_320.0, 156_480.0),
            (500_000.0, 100_000.0),
            (462_500.0, 190_250.0),
            (585_750.0, 35_125.0),
        ];

        for (x, y) in ground_truth {
            let geo = projected_to_geodetic(x, y);
            let back = geodetic_to_projected(geo);
            assert!(
                (back.x - x).abs() < 1.0 && (back.y - y).abs() < 1.0,
                "({x}, {y}) round-tripped to ({}, {})",
                back.x,
                back.y
            );
        }
    }

    #[test]
    fn central_meridian_maps_to_false_easting() {
        // An easting equal to the false easting lies on the central
        // meridian, so the longitude must come back exactly 15°E.
        let geo = projected_to_geodetic(FALSE_EASTING, 150_000.0);
        assert_relative_eq!(geo.x(), CENTRAL_MERIDIAN_DEG, epsilon = 1e-9);
    }

    #[test]
    fn latitude_grows_with_northing() {
        let south = projected_to_geodetic(540_000.0, 50_000.0);
        let north = projected_to_geodetic(540_000.0, 180_000.0);
        assert!(north.y() > south.y());
    }

    #[test]
    fn zone_latitudes_are_plausible() {
        // The populated zone sits in the mid-forties of northern latitude.
        let geo = projected_to_geodetic(546_320.0, 156_480.0);
        assert!(geo.y() > 45.0 && geo.y() < 47.5, "lat {}", geo.y());
        assert!(geo.x() > 13.0 && geo.x() < 17.0, "lng {}", geo.x());
    }

    #[test]
    fn nan_inputs_propagate_as_nan() {
        let geo = projected_to_geodetic(f64::NAN, 150_000.0);
        assert!(geo.x().is_nan() || geo.y().is_nan());
    }
}
