//! GeoJSON output of converted parcels

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, feature::Id};

use crate::domain::LocalParcel;

fn to_feature(parcel: &LocalParcel) -> Feature {
    let mut properties = JsonObject::new();
    if let Some(id) = &parcel.global_id {
        properties.insert("globalId".to_string(), id.clone().into());
    }
    if let Some(height) = parcel.height {
        properties.insert("height".to_string(), height.into());
    }

    Feature {
        geometry: Some(Geometry::new(geojson::Value::from(&parcel.geometry))),
        id: parcel.global_id.clone().map(Id::String),
        properties: Some(properties),
        ..Default::default()
    }
}

/// Build a FeatureCollection with coordinates in local grid meters
pub fn to_feature_collection(parcels: &[LocalParcel]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: parcels.iter().map(to_feature).collect(),
        foreign_members: None,
    }
}

/// Write parcels to a GeoJSON file
pub fn write_geojson(path: &Path, parcels: &[LocalParcel]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create GeoJSON file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, &to_feature_collection(parcels))
        .context("Failed to serialize parcels")?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, polygon};

    fn parcel() -> LocalParcel {
        let square = polygon![
            (x: 200_000.0, y: 450_000.0),
            (x: 200_010.0, y: 450_000.0),
            (x: 200_010.0, y: 450_010.0),
            (x: 200_000.0, y: 450_010.0),
            (x: 200_000.0, y: 450_000.0),
        ];
        LocalParcel {
            geometry: MultiPolygon::new(vec![square]),
            height: Some(4.5),
            global_id: Some("{ABC}".to_string()),
        }
    }

    #[test]
    fn test_feature_properties() {
        let collection = to_feature_collection(&[parcel()]);
        let feature = &collection.features[0];

        assert_eq!(feature.property("globalId"), Some(&"{ABC}".into()));
        assert_eq!(feature.property("height"), Some(&4.5.into()));
        assert_eq!(feature.id, Some(Id::String("{ABC}".to_string())));
    }

    #[test]
    fn test_parcel_without_attributes() {
        let bare = LocalParcel {
            height: None,
            global_id: None,
            ..parcel()
        };
        let collection = to_feature_collection(&[bare]);
        let feature = &collection.features[0];

        assert!(feature.id.is_none());
        assert!(!feature.contains_property("height"));
    }

    #[test]
    fn test_write_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcels.geojson");
        write_geojson(&path, &[parcel(), parcel()]).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["type"], "FeatureCollection");
        assert_eq!(written["features"].as_array().unwrap().len(), 2);
        assert_eq!(written["features"][0]["geometry"]["type"], "MultiPolygon");
        assert_eq!(
            written["features"][0]["geometry"]["coordinates"][0][0][1],
            serde_json::json!([200_010.0, 450_000.0])
        );
    }

    #[test]
    fn test_write_geojson_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("parcels.geojson");
        assert!(write_geojson(&path, &[parcel()]).is_err());
    }
}
