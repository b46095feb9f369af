//! Local projected coordinate system anchored on a cached grid origin
//!
//! Every conversion is expressed relative to one origin computed lazily on
//! first use, so points converted at different times stay consistent with
//! each other until the origin is explicitly reset.

use std::sync::{Mutex, PoisonError};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use tracing::debug;

use crate::domain::{LocalParcel, ParcelFeature, Ring};
use crate::error::GeodesyError;
use crate::geodesy::{
    GeodeticPoint, LocalGrid, ProjectedPoint, apply_helmert, project_unfalsified, to_geocentric,
    to_geodetic,
};

/// WGS84 lon/lat → local grid meters, with a lazily cached origin
///
/// Shared between threads through an `Arc`; the origin is computed under
/// a lock so concurrent first calls agree on a single value.
#[derive(Debug)]
pub struct LocalProjectedCrs {
    grid: LocalGrid,
    origin: Mutex<Option<ProjectedPoint>>,
}

impl Default for LocalProjectedCrs {
    fn default() -> Self {
        Self::new(LocalGrid::default())
    }
}

impl LocalProjectedCrs {
    pub fn new(grid: LocalGrid) -> Self {
        Self {
            grid,
            origin: Mutex::new(None),
        }
    }

    /// Cached origin, computed on first call
    ///
    /// This is the projection of (central meridian, latitude of origin)
    /// with the false easting/northing removed.
    pub fn origin(&self) -> ProjectedPoint {
        let mut cached = self.origin.lock().unwrap_or_else(PoisonError::into_inner);
        *cached.get_or_insert_with(|| self.compute_origin())
    }

    pub fn is_origin_cached(&self) -> bool {
        self.origin
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Forget the cached origin; the next conversion recomputes it
    pub fn reset_origin(&self) {
        *self.origin.lock().unwrap_or_else(PoisonError::into_inner) = None;
        debug!("Local grid origin reset");
    }

    fn compute_origin(&self) -> ProjectedPoint {
        let params = &self.grid.projection;
        let anchor =
            GeodeticPoint::surface(params.central_meridian_deg, params.latitude_of_origin_deg);
        let origin = project_unfalsified(anchor, params);
        debug!(x = origin.x, y = origin.y, "Local grid origin computed");
        origin
    }

    /// Move a WGS84 lon/lat onto the projection ellipsoid
    fn shift_datum(&self, lon_deg: f64, lat_deg: f64) -> Result<GeodeticPoint, GeodesyError> {
        let Some(shift) = &self.grid.datum_shift else {
            return Ok(GeodeticPoint::surface(lon_deg, lat_deg));
        };

        let source = to_geocentric(GeodeticPoint::surface(lon_deg, lat_deg), &shift.source);
        let shifted = apply_helmert(source, &shift.helmert);
        let target = to_geodetic(shifted, &self.grid.projection.ellipsoid);

        if target.is_finite() {
            Ok(target)
        } else {
            Err(GeodesyError::NumericDegeneracy {
                lon: lon_deg,
                lat: lat_deg,
            })
        }
    }

    fn relative_to_origin(&self, point: GeodeticPoint, origin: ProjectedPoint) -> ProjectedPoint {
        let params = &self.grid.projection;
        let raw = project_unfalsified(point, params);
        ProjectedPoint::new(
            raw.x - origin.x + params.false_easting,
            raw.y - origin.y + params.false_northing,
        )
    }

    /// Convert lon/lat degrees to local grid meters
    ///
    /// A non-finite datum shift falls back to projecting the input
    /// coordinates unshifted.
    pub fn lon_lat_to_local_meters(&self, lon_deg: f64, lat_deg: f64) -> ProjectedPoint {
        let origin = self.origin();
        let point = self.shift_datum(lon_deg, lat_deg).unwrap_or_else(|err| {
            debug!(lon = lon_deg, lat = lat_deg, %err, "Datum shift degenerate, projecting raw coordinates");
            GeodeticPoint::surface(lon_deg, lat_deg)
        });
        self.relative_to_origin(point, origin)
    }

    /// Like [`Self::lon_lat_to_local_meters`] but reports a degenerate datum shift
    pub fn lon_lat_to_local_meters_strict(
        &self,
        lon_deg: f64,
        lat_deg: f64,
    ) -> Result<ProjectedPoint, GeodesyError> {
        let origin = self.origin();
        let point = self.shift_datum(lon_deg, lat_deg)?;
        Ok(self.relative_to_origin(point, origin))
    }

    fn convert_ring(&self, ring: &Ring) -> LineString<f64> {
        ring.iter()
            .map(|position| {
                let local = self.lon_lat_to_local_meters(position.lon, position.lat);
                Coord {
                    x: local.x,
                    y: local.y,
                }
            })
            .collect()
    }

    /// Convert every ring of a parcel to local meters
    pub fn convert_feature(&self, feature: &ParcelFeature) -> LocalParcel {
        let polygons: Vec<Polygon<f64>> = feature
            .geometry
            .polygons()
            .filter_map(|rings| {
                let (outer, holes) = rings.split_first()?;
                let interiors = holes.iter().map(|ring| self.convert_ring(ring)).collect();
                Some(Polygon::new(self.convert_ring(outer), interiors))
            })
            .collect();

        LocalParcel {
            geometry: MultiPolygon::new(polygons),
            height: feature.height,
            global_id: feature.global_id.clone(),
        }
    }
}
