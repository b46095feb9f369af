//! Paged ingestion loop
//!
//! Pages are requested one at a time. After each page the stop conditions
//! are checked in a fixed priority order and the winning one is reported as
//! a [`Termination`] next to the accumulated features.

use serde_json::Value;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, trace, warn};

use super::client::{CancelFlag, PageRequest, PageTransport, response_features};
use crate::config::{IngestionConfig, MAX_PAGE_SIZE, clamp_page_size};
use crate::domain::ParcelFeature;
use crate::error::FetchError;
use crate::feature::{matches_target, normalize_feature};

/// Per-run paging options
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    /// Keep paging until a stop condition; `false` fetches a single page
    pub fetch_all: bool,
    /// Requested `$top`, clamped to `1..=MAX_PAGE_SIZE`
    pub page_size: usize,
    /// Stop once this many matches are held; `None` means 1 with a target, else unbounded
    pub max_features: Option<usize>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            fetch_all: true,
            page_size: MAX_PAGE_SIZE,
            max_features: None,
        }
    }
}

impl IngestOptions {
    fn limit(&self, target: Option<&str>) -> Option<usize> {
        self.max_features.or(target.map(|_| 1))
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Cancellation was signalled; features hold what was gathered so far
    Aborted,
    /// Accumulated matches reached the configured maximum
    LimitReached,
    /// Only one page was requested
    SinglePage,
    /// A page came back empty
    Exhausted,
    /// A page held fewer features than requested
    ShortPage,
    /// The target identifier was found
    TargetFound,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Aborted => "cancelled",
            Self::LimitReached => "feature limit reached",
            Self::SinglePage => "single page requested",
            Self::Exhausted => "empty page",
            Self::ShortPage => "last page",
            Self::TargetFound => "target found",
        };
        f.write_str(reason)
    }
}

/// Snapshot handed to the progress callback after each non-empty page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    /// 1-based page number
    pub page: usize,
    /// Offset the page was requested at
    pub skip: usize,
    /// Raw features on this page
    pub received: usize,
    /// Matches accumulated so far
    pub matched: usize,
    /// Malformed features skipped so far
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub features: Vec<ParcelFeature>,
    pub termination: Termination,
    pub pages: usize,
    /// Raw features received over all pages
    pub received: usize,
    pub skipped: usize,
}

enum Step {
    Continue { skip: usize },
    Stop(Termination),
}

struct Run<'a> {
    config: &'a IngestionConfig,
    options: &'a IngestOptions,
    page_size: usize,
    limit: Option<usize>,
    features: Vec<ParcelFeature>,
    pages: usize,
    received: usize,
    skipped: usize,
}

impl<'a> Run<'a> {
    fn new(config: &'a IngestionConfig, options: &'a IngestOptions) -> Self {
        Self {
            config,
            options,
            page_size: clamp_page_size(options.page_size),
            limit: options.limit(config.target_global_id()),
            features: Vec::new(),
            pages: 0,
            received: 0,
            skipped: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.features.len() >= limit)
    }

    fn accept(&mut self, raw: &[Value]) {
        let config = self.config;
        let target = config.target_global_id();
        for record in raw {
            if self.is_full() {
                break;
            }
            let Some(feature) = normalize_feature(record) else {
                trace!("Skipping feature without usable geometry");
                self.skipped += 1;
                continue;
            };
            if matches_target(record, target) {
                self.features.push(feature);
            }
        }
    }

    /// Stop conditions after a page, highest priority first
    fn next_step(&self, skip: usize, received: usize, cancel: &CancelFlag) -> Step {
        if cancel.is_cancelled() {
            Step::Stop(Termination::Aborted)
        } else if self.is_full() {
            Step::Stop(Termination::LimitReached)
        } else if !self.options.fetch_all {
            Step::Stop(Termination::SinglePage)
        } else if received < self.page_size {
            Step::Stop(Termination::ShortPage)
        } else if self.config.target_global_id().is_some() && !self.features.is_empty() {
            Step::Stop(Termination::TargetFound)
        } else {
            Step::Continue {
                skip: skip + received,
            }
        }
    }

    fn finish(self, termination: Termination) -> IngestOutcome {
        info!(
            features = self.features.len(),
            pages = self.pages,
            received = self.received,
            skipped = self.skipped,
            ?termination,
            "Ingestion finished"
        );
        IngestOutcome {
            features: self.features,
            termination,
            pages: self.pages,
            received: self.received,
            skipped: self.skipped,
        }
    }
}

fn validate(config: &IngestionConfig) -> Result<(), FetchError> {
    if config.api_key.is_empty() {
        return Err(FetchError::configuration("API key is not set"));
    }
    if config.base_url.is_empty() {
        return Err(FetchError::configuration("base URL is not set"));
    }
    if config.dataset_id.is_empty() {
        return Err(FetchError::configuration("dataset id is not set"));
    }
    Ok(())
}

/// Page through the dataset and collect normalized, target-matching parcels
///
/// Configuration problems fail before any request. A transport failure
/// discards whatever was accumulated. Errors returned by `progress`, and
/// panics raised inside it, are logged and otherwise ignored.
pub fn ingest<T, F>(
    transport: &T,
    config: &IngestionConfig,
    options: &IngestOptions,
    mut progress: F,
    cancel: &CancelFlag,
) -> Result<IngestOutcome, FetchError>
where
    T: PageTransport + ?Sized,
    F: FnMut(&PageProgress) -> anyhow::Result<()>,
{
    validate(config)?;

    let mut run = Run::new(config, options);
    let mut skip = 0;

    let termination = loop {
        if cancel.is_cancelled() {
            break Termination::Aborted;
        }

        let request = PageRequest::new(config, run.page_size, skip);
        debug!(skip, top = run.page_size, "Requesting page");

        let body = match transport.fetch_page(&request, cancel) {
            Ok(body) => body,
            Err(FetchError::Cancelled) if cancel.is_cancelled() => break Termination::Aborted,
            Err(e) => return Err(e),
        };

        let raw = response_features(&body);
        run.pages += 1;
        if raw.is_empty() {
            break Termination::Exhausted;
        }

        let received = raw.len();
        run.received += received;
        run.accept(raw);
        debug!(
            page = run.pages,
            skip,
            received,
            matched = run.features.len(),
            "Page processed"
        );

        let snapshot = PageProgress {
            page: run.pages,
            skip,
            received,
            matched: run.features.len(),
            skipped: run.skipped,
        };
        match panic::catch_unwind(AssertUnwindSafe(|| progress(&snapshot))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Progress callback failed: {:#}", e),
            Err(_) => warn!(page = run.pages, "Progress callback panicked"),
        }

        match run.next_step(skip, received, cancel) {
            Step::Continue { skip: next } => skip = next,
            Step::Stop(termination) => break termination,
        }
    };

    Ok(run.finish(termination))
}
