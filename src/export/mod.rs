pub mod geojson;

pub use self::geojson::{to_feature_collection, write_geojson};
