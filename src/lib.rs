//! parcelgrid - Fetch municipal parcel datasets and convert them to a local metric grid

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod feature;
pub mod geodesy;
pub mod geometry;
pub mod loader;

pub use api::{CancelFlag, IngestOptions, PageProgress, Termination};
pub use config::{ConfigureOptions, IngestionConfig};
pub use error::{FetchError, GeodesyError};
pub use geometry::LocalProjectedCrs;
pub use loader::{LoadOutcome, ParcelLoader};
