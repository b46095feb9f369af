pub mod normalize;

pub use normalize::{
    GeometrySource, NormalizedGeometry, extract_global_id, extract_height, matches_target,
    normalize_feature, normalize_geometry,
};
