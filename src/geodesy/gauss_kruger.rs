//! Gauss-Krüger (transverse Mercator) forward projection
//!
//! Series expansion in the longitude difference from the central meridian:
//! northing up to l⁶, easting up to l⁷. Accuracy is millimetric within a
//! few degrees of the central meridian and degrades silently beyond that;
//! no range check is performed.

use super::{EllipsoidParams, GeodeticPoint, ProjectionParams};

/// Planar grid coordinates in meters (x = easting, y = northing)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Coefficients A0..A6 of the meridian arc series for one ellipsoid
#[derive(Debug, Clone, Copy)]
struct MeridianArc {
    a0: f64,
    a2: f64,
    a4: f64,
    a6: f64,
}

impl MeridianArc {
    fn new(ellipsoid: &EllipsoidParams) -> Self {
        let e2 = ellipsoid.eccentricity_squared();

        let m0 = ellipsoid.semi_major_axis * (1.0 - e2);
        let m2 = 1.5 * e2 * m0;
        let m4 = 1.25 * e2 * m2;
        let m6 = 7.0 / 6.0 * e2 * m4;

        Self {
            a0: m0 + m2 / 2.0 + 3.0 * m4 / 8.0 + 5.0 * m6 / 16.0,
            a2: m2 / 2.0 + m4 / 2.0 + 15.0 * m6 / 32.0,
            a4: m4 / 8.0 + 3.0 * m6 / 16.0,
            a6: m6 / 32.0,
        }
    }

    fn length(&self, lat: f64) -> f64 {
        self.a0 * lat - self.a2 / 2.0 * (2.0 * lat).sin() + self.a4 / 4.0 * (4.0 * lat).sin()
            - self.a6 / 6.0 * (6.0 * lat).sin()
    }
}

/// Meridian arc length from the equator to a latitude (radians), in meters
pub fn meridian_arc(lat: f64, ellipsoid: &EllipsoidParams) -> f64 {
    MeridianArc::new(ellipsoid).length(lat)
}

/// Project without false easting/northing
///
/// Northing is measured from the equator; easting from the central meridian.
pub fn project_unfalsified(point: GeodeticPoint, params: &ProjectionParams) -> ProjectedPoint {
    let ellipsoid = &params.ellipsoid;
    let ep2 = ellipsoid.second_eccentricity_squared();

    let lat = point.lat_deg.to_radians();
    // wrap across the ±180° seam before feeding the series
    let delta = (point.lon_deg - params.central_meridian_deg).to_radians();
    let l = delta.sin().atan2(delta.cos());

    let (sin_lat, cos_lat) = lat.sin_cos();
    let t = sin_lat / cos_lat;
    let t2 = t * t;
    let t4 = t2 * t2;
    let eta2 = ep2 * cos_lat * cos_lat;
    let n = ellipsoid.prime_vertical_radius(lat);
    let m = cos_lat * l;
    let m2 = m * m;

    let sigma = meridian_arc(lat, ellipsoid);

    let northing = sigma
        + n * t
            * (m2 / 2.0
                + (5.0 - t2 + 9.0 * eta2 + 4.0 * eta2 * eta2) * m2 * m2 / 24.0
                + (61.0 - 58.0 * t2 + t4) * m2 * m2 * m2 / 720.0);

    let easting = n
        * (m + (1.0 - t2 + eta2) * m * m2 / 6.0
            + (5.0 - 18.0 * t2 + t4 + 14.0 * eta2 - 58.0 * eta2 * t2) * m * m2 * m2 / 120.0
            + (61.0 - 479.0 * t2 + 179.0 * t4 - t4 * t2) * m * m2 * m2 * m2 / 5040.0);

    ProjectedPoint::new(easting * params.scale_factor, northing * params.scale_factor)
}

/// Project a geodetic point onto the grid, false easting/northing included
pub fn project(point: GeodeticPoint, params: &ProjectionParams) -> ProjectedPoint {
    let raw = project_unfalsified(point, params);
    ProjectedPoint::new(raw.x + params.false_easting, raw.y + params.false_northing)
}
