//! Ellipsoid, datum-shift and grid parameters
//!
//! Everything here is a constant: the grid is defined once and never
//! mutated at runtime.

/// Reference ellipsoid described by its semi-major axis and inverse flattening
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipsoidParams {
    /// Semi-major (equatorial) axis in meters
    pub semi_major_axis: f64,
    /// Inverse flattening (1/f), always > 0
    pub inverse_flattening: f64,
}

impl EllipsoidParams {
    pub const WGS84: Self = Self {
        semi_major_axis: 6_378_137.0,
        inverse_flattening: 298.257223563,
    };

    pub const BESSEL_1841: Self = Self {
        semi_major_axis: 6_377_397.155,
        inverse_flattening: 299.1528128,
    };

    pub const fn new(semi_major_axis: f64, inverse_flattening: f64) -> Self {
        Self {
            semi_major_axis,
            inverse_flattening,
        }
    }

    pub fn flattening(&self) -> f64 {
        1.0 / self.inverse_flattening
    }

    /// Semi-minor (polar) axis in meters
    pub fn semi_minor_axis(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.flattening())
    }

    /// First eccentricity squared, e² = 2f − f²
    pub fn eccentricity_squared(&self) -> f64 {
        let f = self.flattening();
        2.0 * f - f * f
    }

    /// Second eccentricity squared, e'² = e² / (1 − e²)
    pub fn second_eccentricity_squared(&self) -> f64 {
        let e2 = self.eccentricity_squared();
        e2 / (1.0 - e2)
    }

    /// Prime-vertical radius of curvature at a latitude (radians)
    pub fn prime_vertical_radius(&self, lat: f64) -> f64 {
        let sin_lat = lat.sin();
        self.semi_major_axis / (1.0 - self.eccentricity_squared() * sin_lat * sin_lat).sqrt()
    }
}

/// Seven-parameter similarity transform between two geocentric frames
///
/// Position-vector convention: a positive rotation turns the point
/// counter-clockwise about the axis seen from its positive end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelmertParams {
    /// Translations in meters
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    /// Rotations in arcseconds
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    /// Scale difference in parts per million
    pub scale_ppm: f64,
}

impl HelmertParams {
    pub const IDENTITY: Self = Self {
        dx: 0.0,
        dy: 0.0,
        dz: 0.0,
        rx: 0.0,
        ry: 0.0,
        rz: 0.0,
        scale_ppm: 0.0,
    };

    /// Korean 1985 (Bessel) → WGS84
    pub const BESSEL_TO_WGS84: Self = Self {
        dx: -115.80,
        dy: 474.99,
        dz: 674.11,
        rx: 1.16,
        ry: -2.31,
        rz: -1.63,
        scale_ppm: 6.43,
    };

    /// WGS84 → Korean 1985 (Bessel), the small-angle inverse of [`Self::BESSEL_TO_WGS84`]
    pub const WGS84_TO_BESSEL: Self = Self::BESSEL_TO_WGS84.inverse();

    /// Small-angle inverse: every parameter negated
    pub const fn inverse(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
            dz: -self.dz,
            rx: -self.rx,
            ry: -self.ry,
            rz: -self.rz,
            scale_ppm: -self.scale_ppm,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Transverse-Mercator grid definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    pub ellipsoid: EllipsoidParams,
    pub central_meridian_deg: f64,
    pub latitude_of_origin_deg: f64,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl ProjectionParams {
    /// Bessel central belt: 127°E + 10.405", 38°N, k = 1, (200 000, 500 000)
    pub const BESSEL_CENTRAL_BELT: Self = Self {
        ellipsoid: EllipsoidParams::BESSEL_1841,
        central_meridian_deg: 127.002_890_277_777_8,
        latitude_of_origin_deg: 38.0,
        scale_factor: 1.0,
        false_easting: 200_000.0,
        false_northing: 500_000.0,
    };
}

/// Datum shift applied before projecting: source ellipsoid plus Helmert set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatumShift {
    pub source: EllipsoidParams,
    pub helmert: HelmertParams,
}

/// Full definition of the local grid: optional datum shift, then projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalGrid {
    pub datum_shift: Option<DatumShift>,
    pub projection: ProjectionParams,
}

impl LocalGrid {
    /// Grid whose input coordinates are already on the projection ellipsoid
    pub const fn without_datum_shift(projection: ProjectionParams) -> Self {
        Self {
            datum_shift: None,
            projection,
        }
    }
}

impl Default for LocalGrid {
    /// WGS84 input, Bessel central belt output
    fn default() -> Self {
        Self {
            datum_shift: Some(DatumShift {
                source: EllipsoidParams::WGS84,
                helmert: HelmertParams::WGS84_TO_BESSEL,
            }),
            projection: ProjectionParams::BESSEL_CENTRAL_BELT,
        }
    }
}
