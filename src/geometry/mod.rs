pub mod local;

pub use local::LocalProjectedCrs;
