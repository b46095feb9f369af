pub mod client;
pub mod ingest;

pub use client::{CancelFlag, HttpTransport, PageRequest, PageTransport, response_features};
pub use ingest::{IngestOptions, IngestOutcome, PageProgress, Termination, ingest};
