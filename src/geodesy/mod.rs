pub mod ellipsoid;
pub mod gauss_kruger;
pub mod geocentric;
pub mod helmert;

pub use ellipsoid::{DatumShift, EllipsoidParams, HelmertParams, LocalGrid, ProjectionParams};
pub use gauss_kruger::{ProjectedPoint, meridian_arc, project, project_unfalsified};
pub use geocentric::{
    GeocentricPoint, GeodeticPoint, normalize_longitude, to_geocentric, to_geodetic,
};
pub use helmert::apply_helmert;
