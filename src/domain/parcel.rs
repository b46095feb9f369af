use geo::MultiPolygon;

/// A ring vertex in degrees, with an optional altitude in meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
    pub alt: Option<f64>,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            alt: None,
        }
    }

    pub fn with_alt(lon: f64, lat: f64, alt: f64) -> Self {
        Self {
            lon,
            lat,
            alt: Some(alt),
        }
    }
}

/// Ordered ring of positions
pub type Ring = Vec<Position>;

/// Parcel outline in degrees
///
/// For every polygon the first ring is the outer boundary and any further
/// rings are holes.
#[derive(Debug, Clone, PartialEq)]
pub enum ParcelGeometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl ParcelGeometry {
    /// Iterate over polygons as ring lists
    pub fn polygons(&self) -> Box<dyn Iterator<Item = &[Ring]> + '_> {
        match self {
            Self::Polygon(rings) => Box::new(std::iter::once(rings.as_slice())),
            Self::MultiPolygon(polygons) => Box::new(polygons.iter().map(Vec::as_slice)),
        }
    }
}

/// A parcel as delivered by the feature normalizer
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelFeature {
    pub geometry: ParcelGeometry,
    pub height: Option<f64>,
    pub global_id: Option<String>,
}

impl ParcelFeature {
    /// Every polygon has an outer ring of at least three positions
    pub fn is_valid(&self) -> bool {
        self.geometry.polygons().all(|rings| {
            rings.first().is_some_and(|outer| outer.len() >= 3)
        })
    }
}

/// A parcel converted to local grid meters, ready for scene construction
#[derive(Debug, Clone, PartialEq)]
pub struct LocalParcel {
    pub geometry: MultiPolygon<f64>,
    pub height: Option<f64>,
    pub global_id: Option<String>,
}
