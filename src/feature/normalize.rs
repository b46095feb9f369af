//! Normalizes heterogeneous API feature records into [`ParcelFeature`] values
//!
//! Municipal endpoints disagree on where geometry lives: standard GeoJSON
//! `geometry`, Esri `{ "rings": [...] }`, or a JSON string tucked into one
//! of several property names. Each shape is one [`GeometrySource`] variant
//! and all of them go through [`normalize_geometry`].

use serde_json::{Map, Number, Value};

use crate::domain::{ParcelFeature, ParcelGeometry, Position, Ring};

/// Property names that may hold an embedded geometry, in lookup order
const GEOMETRY_KEYS: [&str; 4] = ["geoData", "GeoData", "geom", "geometry"];

/// Attribute names carrying a height in meters, in lookup order
const HEIGHT_KEYS: [&str; 10] = [
    "height",
    "Height",
    "HEIGHT",
    "bldgHeight",
    "BLDG_HEIGHT",
    "elevation",
    "Elevation",
    "ELEVATION",
    "alt",
    "z",
];

/// Attribute names carrying the feature's global identifier, in lookup order
const GLOBAL_ID_KEYS: [&str; 6] = [
    "GlobalID",
    "GlobalId",
    "globalId",
    "globalid",
    "GLOBALID",
    "global_id",
];

/// Largest magnitude below which every integral f64 is exact (2^53)
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Where a feature's geometry was found and in which shape
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource<'a> {
    /// GeoJSON geometry object with `type` and `coordinates`
    GeoJson(&'a Value),
    /// Esri geometry object with `rings`
    EsriRings(&'a Value),
    /// JSON-encoded geometry stored as a string attribute
    Encoded(&'a str),
}

/// Geometry after normalization, coordinates in degrees
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedGeometry {
    Point(Position),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl NormalizedGeometry {
    /// Polygonal geometries become parcel outlines; points do not
    pub fn into_parcel_geometry(self) -> Option<ParcelGeometry> {
        match self {
            Self::Polygon(rings) => Some(ParcelGeometry::Polygon(rings)),
            Self::MultiPolygon(polygons) => Some(ParcelGeometry::MultiPolygon(polygons)),
            Self::Point(_) => None,
        }
    }
}

impl<'a> GeometrySource<'a> {
    /// Find the geometry of a raw feature record
    ///
    /// The feature's own `geometry` wins; otherwise the embedded geometry
    /// attributes are tried in order.
    pub fn detect(feature: &'a Value) -> Option<Self> {
        if let Some(source) = feature.get("geometry").and_then(Self::classify) {
            return Some(source);
        }

        attribute_maps(feature)
            .flat_map(|attrs| GEOMETRY_KEYS.iter().filter_map(move |key| attrs.get(*key)))
            .find_map(Self::classify)
    }

    fn classify(value: &'a Value) -> Option<Self> {
        match value {
            Value::String(encoded) if !encoded.trim().is_empty() => Some(Self::Encoded(encoded)),
            Value::Object(map) if map.contains_key("rings") => Some(Self::EsriRings(value)),
            Value::Object(map) if map.contains_key("coordinates") => Some(Self::GeoJson(value)),
            Value::Object(map) => map.get("geometry").and_then(Self::classify),
            _ => None,
        }
    }

    pub fn normalize(&self) -> Option<NormalizedGeometry> {
        match self {
            Self::GeoJson(geometry) => normalize_geojson(geometry),
            Self::EsriRings(geometry) => normalize_esri(geometry),
            Self::Encoded(text) => {
                let decoded: Value = serde_json::from_str(text).ok()?;
                match GeometrySource::classify(&decoded)? {
                    // one level of decoding only
                    GeometrySource::Encoded(_) => None,
                    source => source.normalize(),
                }
            }
        }
    }
}

/// Attribute containers of a feature: `properties`, Esri `attributes`, then the record itself
fn attribute_maps(feature: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    ["properties", "attributes"]
        .into_iter()
        .filter_map(|key| feature.get(key).and_then(Value::as_object))
        .chain(feature.as_object())
}

/// Coerce a JSON number or numeric string to a finite f64
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn parse_position(value: &Value) -> Option<Position> {
    let coords = value.as_array()?;
    let lon = coerce_number(coords.first()?)?;
    let lat = coerce_number(coords.get(1)?)?;
    Some(match coords.get(2).and_then(coerce_number) {
        Some(alt) => Position::with_alt(lon, lat, alt),
        None => Position::new(lon, lat),
    })
}

fn parse_ring(value: &Value) -> Option<Ring> {
    value.as_array()?.iter().map(parse_position).collect()
}

/// Parse a ring list, dropping empty rings; `None` if any position is malformed
fn parse_ring_list(value: &Value) -> Option<Vec<Ring>> {
    let rings = value
        .as_array()?
        .iter()
        .map(parse_ring)
        .collect::<Option<Vec<_>>>()?;
    Some(rings.into_iter().filter(|ring| !ring.is_empty()).collect())
}

/// Like [`parse_ring_list`] but also `None` when no ring is left
fn parse_rings(value: &Value) -> Option<Vec<Ring>> {
    parse_ring_list(value).filter(|rings| !rings.is_empty())
}

fn parse_multi_polygon(value: &Value) -> Option<Vec<Vec<Ring>>> {
    let polygons: Vec<Vec<Ring>> = value
        .as_array()?
        .iter()
        .map(parse_ring_list)
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .filter(|rings| !rings.is_empty())
        .collect();
    (!polygons.is_empty()).then_some(polygons)
}

fn normalize_geojson(geometry: &Value) -> Option<NormalizedGeometry> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type").and_then(Value::as_str)? {
        "Point" => parse_position(coordinates).map(NormalizedGeometry::Point),
        "Polygon" => parse_rings(coordinates).map(NormalizedGeometry::Polygon),
        "MultiPolygon" => parse_multi_polygon(coordinates).map(NormalizedGeometry::MultiPolygon),
        _ => None,
    }
}

/// Esri rings become one polygon: first ring outer, the rest holes
fn normalize_esri(geometry: &Value) -> Option<NormalizedGeometry> {
    parse_rings(geometry.get("rings")?).map(NormalizedGeometry::Polygon)
}

/// Normalize whatever geometry a feature carries; `None` means skip it
pub fn normalize_geometry(feature: &Value) -> Option<NormalizedGeometry> {
    GeometrySource::detect(feature)?.normalize()
}

/// Height from the known attribute names, else the third coordinate of a 3-D point
pub fn extract_height(feature: &Value) -> Option<f64> {
    let attribute = attribute_maps(feature).find_map(|attrs| {
        HEIGHT_KEYS
            .iter()
            .find_map(|key| attrs.get(*key).and_then(coerce_number))
    });
    if attribute.is_some() {
        return attribute;
    }

    match normalize_geometry(feature)? {
        NormalizedGeometry::Point(position) => position.alt,
        _ => None,
    }
}

/// Global identifier as a string, from the known attribute names
pub fn extract_global_id(feature: &Value) -> Option<String> {
    attribute_maps(feature).find_map(|attrs| {
        GLOBAL_ID_KEYS.iter().find_map(|key| match attrs.get(*key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(number_to_id(n)),
            _ => None,
        })
    })
}

/// Integral floats print without a fraction, so `42.0` matches `"42"`
fn number_to_id(number: &Number) -> String {
    match number.as_f64() {
        Some(value)
            if number.is_f64() && value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER =>
        {
            (value as i64).to_string()
        }
        _ => number.to_string(),
    }
}

/// Exact, case-sensitive identifier match; no target matches everything
pub fn matches_target(feature: &Value, target: Option<&str>) -> bool {
    match target {
        None => true,
        Some(target) => extract_global_id(feature).as_deref() == Some(target),
    }
}

/// Build a [`ParcelFeature`] from a raw record
///
/// `None` for non-polygonal or malformed geometry, including outer rings
/// with fewer than three positions.
pub fn normalize_feature(feature: &Value) -> Option<ParcelFeature> {
    let geometry = normalize_geometry(feature)?.into_parcel_geometry()?;
    let parcel = ParcelFeature {
        geometry,
        height: extract_height(feature),
        global_id: extract_global_id(feature),
    };
    parcel.is_valid().then_some(parcel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square() -> Vec<Position> {
        vec![
            Position::new(127.0, 37.5),
            Position::new(127.001, 37.5),
            Position::new(127.001, 37.501),
            Position::new(127.0, 37.5),
        ]
    }

    #[test]
    fn test_standard_geojson_polygon() {
        let feature = json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[127.0, 37.5], [127.001, 37.5], [127.001, 37.501], [127.0, 37.5]]]
            },
            "properties": {"GlobalID": "{A1}"}
        });

        assert_eq!(
            normalize_geometry(&feature),
            Some(NormalizedGeometry::Polygon(vec![square()]))
        );
        assert!(matches!(
            GeometrySource::detect(&feature),
            Some(GeometrySource::GeoJson(_))
        ));
    }

    #[test]
    fn test_encoded_esri_rings_in_geo_data() {
        let encoded = r#"{"rings":[[["127.0","37.5"],["127.001","37.5"],[127.001,"37.501"],[127.0,37.5]]]}"#;
        let feature = json!({
            "type": "Feature",
            "geometry": null,
            "properties": {"geoData": encoded}
        });

        assert!(matches!(
            GeometrySource::detect(&feature),
            Some(GeometrySource::Encoded(_))
        ));
        assert_eq!(
            normalize_geometry(&feature),
            Some(NormalizedGeometry::Polygon(vec![square()]))
        );
    }

    #[test]
    fn test_esri_rings_become_polygon_with_holes() {
        let feature = json!({
            "attributes": {"GLOBALID": "x"},
            "geometry": {"rings": [
                [[0, 0], [10, 0], [10, 10], [0, 0]],
                [[2, 2], [3, 2], [3, 3], [2, 2]]
            ]}
        });

        match normalize_geometry(&feature) {
            Some(NormalizedGeometry::Polygon(rings)) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[1][0], Position::new(2.0, 2.0));
            }
            other => panic!("expected polygon, got {:?}", other),
        }
        assert_eq!(extract_global_id(&feature).as_deref(), Some("x"));
    }

    #[test]
    fn test_object_geometry_under_alternate_key() {
        let feature = json!({
            "properties": {
                "geom": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[127.0, 37.5], [127.001, 37.5], [127.001, 37.501], [127.0, 37.5]]],
                        []
                    ]
                }
            }
        });

        assert_eq!(
            normalize_geometry(&feature),
            Some(NormalizedGeometry::MultiPolygon(vec![vec![square()]]))
        );
    }

    #[test]
    fn test_malformed_geometry_is_rejected() {
        let bad_number = json!({
            "geometry": {"type": "Polygon", "coordinates": [[[127.0, "north"], [1, 2], [3, 4]]]}
        });
        let unsupported = json!({"geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}});
        let broken_string = json!({"properties": {"GeoData": "{not json"}});
        let nothing = json!({"properties": {"name": "parcel"}});

        assert_eq!(normalize_geometry(&bad_number), None);
        assert_eq!(normalize_geometry(&unsupported), None);
        assert_eq!(normalize_geometry(&broken_string), None);
        assert_eq!(normalize_geometry(&nothing), None);
        assert_eq!(normalize_feature(&nothing), None);
    }

    #[test]
    fn test_point_is_not_a_parcel() {
        let feature = json!({"geometry": {"type": "Point", "coordinates": [127.0, 37.5, 42.0]}});
        assert!(matches!(
            normalize_geometry(&feature),
            Some(NormalizedGeometry::Point(_))
        ));
        assert_eq!(normalize_feature(&feature), None);
    }

    #[test]
    fn test_extract_height() {
        let string_height = json!({"properties": {"HEIGHT": "12.5", "elevation": 3.0}});
        assert_eq!(extract_height(&string_height), Some(12.5));

        let ordered = json!({"properties": {"Height": 7, "elevation": 3.0}});
        assert_eq!(extract_height(&ordered), Some(7.0));

        let non_finite = json!({"properties": {"height": "NaN", "z": 4}});
        assert_eq!(extract_height(&non_finite), Some(4.0));

        let point = json!({"geometry": {"type": "Point", "coordinates": [127.0, 37.5, 42.0]}});
        assert_eq!(extract_height(&point), Some(42.0));

        let flat_point = json!({"geometry": {"type": "Point", "coordinates": [127.0, 37.5]}});
        assert_eq!(extract_height(&flat_point), None);
    }

    #[test]
    fn test_matches_target() {
        let feature = json!({"properties": {"globalId": "{ABC-123}"}});

        assert!(matches_target(&feature, None));
        assert!(matches_target(&feature, Some("{ABC-123}")));
        assert!(!matches_target(&feature, Some("{abc-123}")));
        assert!(!matches_target(&json!({"properties": {}}), Some("{ABC-123}")));

        let numeric = json!({"properties": {"global_id": 42}});
        assert!(matches_target(&numeric, Some("42")));
    }

    #[test]
    fn test_float_identifiers() {
        let integral = json!({"properties": {"GlobalID": 42.0}});
        assert_eq!(extract_global_id(&integral).as_deref(), Some("42"));
        assert!(matches_target(&integral, Some("42")));

        let negative = json!({"attributes": {"GLOBALID": -7.0}});
        assert_eq!(extract_global_id(&negative).as_deref(), Some("-7"));

        let fractional = json!({"properties": {"GlobalID": 42.5}});
        assert_eq!(extract_global_id(&fractional).as_deref(), Some("42.5"));
    }

    #[test]
    fn test_short_outer_ring_is_not_a_parcel() {
        let segment = json!({
            "geometry": {"type": "Polygon", "coordinates": [[[127.0, 37.5], [127.1, 37.6]]]}
        });
        assert!(normalize_geometry(&segment).is_some());
        assert_eq!(normalize_feature(&segment), None);

        let esri_segment = json!({"geometry": {"rings": [[[127.0, 37.5], [127.1, 37.6]]]}});
        assert_eq!(normalize_feature(&esri_segment), None);
    }

    #[test]
    fn test_normalize_feature_collects_attributes() {
        let feature = json!({
            "geometry": {"type": "Polygon", "coordinates": [[[127.0, 37.5], [127.001, 37.5], [127.001, 37.501], [127.0, 37.5]]]},
            "properties": {"GlobalID": "{P1}", "height": 9.5}
        });

        let parcel = normalize_feature(&feature).unwrap();
        assert_eq!(parcel.geometry, ParcelGeometry::Polygon(vec![square()]));
        assert_eq!(parcel.height, Some(9.5));
        assert_eq!(parcel.global_id.as_deref(), Some("{P1}"));
    }
}
