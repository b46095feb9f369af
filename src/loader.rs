//! Session object tying configuration, ingestion and local projection together

use std::sync::Arc;

use tracing::info;

use crate::api::{CancelFlag, IngestOptions, PageProgress, PageTransport, Termination, ingest};
use crate::config::{ConfigureOptions, IngestionConfig};
use crate::domain::LocalParcel;
use crate::error::FetchError;
use crate::geometry::LocalProjectedCrs;

/// Parcels of one load, already in local grid meters
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub parcels: Vec<LocalParcel>,
    pub termination: Termination,
    pub pages: usize,
    pub received: usize,
    pub skipped: usize,
}

/// Holds the active data source and the shared local projection
pub struct ParcelLoader {
    config: IngestionConfig,
    crs: Arc<LocalProjectedCrs>,
    transport: Box<dyn PageTransport + Send + Sync>,
}

impl ParcelLoader {
    pub fn new(transport: impl PageTransport + Send + Sync + 'static) -> Self {
        Self {
            config: IngestionConfig::default(),
            crs: Arc::new(LocalProjectedCrs::default()),
            transport: Box::new(transport),
        }
    }

    /// Share a projection with other users of the same local grid
    pub fn with_crs(mut self, crs: Arc<LocalProjectedCrs>) -> Self {
        self.crs = crs;
        self
    }

    /// Replace the data source configuration
    ///
    /// The cached grid origin survives unless `reset_origin` is set.
    pub fn configure(&mut self, options: &ConfigureOptions) {
        self.config = IngestionConfig::from(options);
        if options.reset_origin {
            self.crs.reset_origin();
        }
        info!(
            dataset = %self.config.dataset_id,
            filter = self.config.filter().unwrap_or("-"),
            target = self.config.target_global_id().unwrap_or("-"),
            "Data source configured"
        );
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    pub fn crs(&self) -> &Arc<LocalProjectedCrs> {
        &self.crs
    }

    /// Fetch the configured dataset and convert every parcel to local meters
    pub fn load<F>(
        &self,
        options: &IngestOptions,
        progress: F,
        cancel: &CancelFlag,
    ) -> Result<LoadOutcome, FetchError>
    where
        F: FnMut(&PageProgress) -> anyhow::Result<()>,
    {
        let outcome = ingest(
            self.transport.as_ref(),
            &self.config,
            options,
            progress,
            cancel,
        )?;

        let parcels = outcome
            .features
            .iter()
            .map(|feature| self.crs.convert_feature(feature))
            .collect();

        Ok(LoadOutcome {
            parcels,
            termination: outcome.termination,
            pages: outcome.pages,
            received: outcome.received,
            skipped: outcome.skipped,
        })
    }
}
