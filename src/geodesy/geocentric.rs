//! Geodetic ↔ geocentric (ECEF) conversion on an arbitrary ellipsoid

use super::EllipsoidParams;

/// Number of latitude refinement passes in [`to_geodetic`]
const LATITUDE_ITERATIONS: usize = 5;

/// Longitude/latitude in degrees, ellipsoidal height in meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub height: f64,
}

impl GeodeticPoint {
    pub fn new(lon_deg: f64, lat_deg: f64, height: f64) -> Self {
        Self {
            lon_deg,
            lat_deg,
            height,
        }
    }

    /// Point on the ellipsoid surface (height 0)
    pub fn surface(lon_deg: f64, lat_deg: f64) -> Self {
        Self::new(lon_deg, lat_deg, 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.lon_deg.is_finite() && self.lat_deg.is_finite() && self.height.is_finite()
    }
}

/// Earth-centered Cartesian coordinates in meters, z toward the north pole
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocentricPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GeocentricPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Wrap a longitude in degrees into (−180, 180]
pub fn normalize_longitude(lon_deg: f64) -> f64 {
    let wrapped = (lon_deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 { 180.0 } else { wrapped }
}

/// Closed-form geodetic → geocentric conversion
pub fn to_geocentric(point: GeodeticPoint, ellipsoid: &EllipsoidParams) -> GeocentricPoint {
    let lon = point.lon_deg.to_radians();
    let lat = point.lat_deg.to_radians();
    let e2 = ellipsoid.eccentricity_squared();
    let n = ellipsoid.prime_vertical_radius(lat);

    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    GeocentricPoint {
        x: (n + point.height) * cos_lat * cos_lon,
        y: (n + point.height) * cos_lat * sin_lon,
        z: (n * (1.0 - e2) + point.height) * sin_lat,
    }
}

/// Geocentric → geodetic conversion
///
/// Latitude starts from Bowring's closed-form estimate and is refined a
/// fixed number of times with φ = atan2(Z + e²·N·sinφ, p). Points on the
/// polar axis (p = 0) short-circuit to longitude 0 and latitude ±90°.
pub fn to_geodetic(point: GeocentricPoint, ellipsoid: &EllipsoidParams) -> GeodeticPoint {
    let a = ellipsoid.semi_major_axis;
    let b = ellipsoid.semi_minor_axis();
    let e2 = ellipsoid.eccentricity_squared();
    let ep2 = ellipsoid.second_eccentricity_squared();

    let p = point.x.hypot(point.y);

    if p == 0.0 {
        let lat_deg = if point.z >= 0.0 { 90.0 } else { -90.0 };
        return GeodeticPoint::new(0.0, lat_deg, point.z.abs() - b);
    }

    let theta = (point.z * a).atan2(p * b);
    let (sin_theta, cos_theta) = theta.sin_cos();
    let mut lat = (point.z + ep2 * b * sin_theta.powi(3)).atan2(p - e2 * a * cos_theta.powi(3));

    for _ in 0..LATITUDE_ITERATIONS {
        let n = ellipsoid.prime_vertical_radius(lat);
        lat = (point.z + e2 * n * lat.sin()).atan2(p);
    }

    let (sin_lat, cos_lat) = lat.sin_cos();
    let height = p * cos_lat + point.z * sin_lat - a * (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let lon = point.y.atan2(point.x);

    GeodeticPoint::new(
        normalize_longitude(lon.to_degrees()),
        lat.to_degrees(),
        height,
    )
}
