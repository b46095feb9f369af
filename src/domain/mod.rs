pub mod parcel;

pub use parcel::{LocalParcel, ParcelFeature, ParcelGeometry, Position, Ring};
