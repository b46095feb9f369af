use super::{GeocentricPoint, HelmertParams};

/// Radians per arcsecond
const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// Apply a small-angle seven-parameter Helmert transform
///
/// x' = dx + (1+s)·x − rz·y + ry·z
/// y' = dy + rz·x + (1+s)·y − rx·z
/// z' = dz − ry·x + rx·y + (1+s)·z
pub fn apply_helmert(point: GeocentricPoint, params: &HelmertParams) -> GeocentricPoint {
    let s = 1.0 + params.scale_ppm * 1e-6;
    let rx = params.rx * ARCSEC_TO_RAD;
    let ry = params.ry * ARCSEC_TO_RAD;
    let rz = params.rz * ARCSEC_TO_RAD;
    let GeocentricPoint { x, y, z } = point;

    GeocentricPoint {
        x: params.dx + s * x - rz * y + ry * z,
        y: params.dy + rz * x + s * y - rx * z,
        z: params.dz - ry * x + rx * y + s * z,
    }
}
