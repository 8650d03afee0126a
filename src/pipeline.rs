//! Top-level entry point.
//!
//! `PanelHub` owns the collaborators and the result cache and runs one
//! request end to end: validate, look up the cache, locate and fetch the
//! snapshot, filter, normalize, merge, assemble, store, then window.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::assemble::{PanelDataset, assemble};
use crate::cache::{CacheKey, ResultCache};
use crate::cleaning::normalize_grid;
use crate::config::{CleaningMode, PanelRequest};
use crate::data::PanelTable;
use crate::errors::PanelError;
use crate::location::LocationFilter;
use crate::merge::{JoinContext, MergePipeline, MergeSources};
use crate::provenance::{CitationFormatter, SourceMetadata, SourceTableCitation};
use crate::snapshot::{self, SnapshotLocation};
use crate::transport::{ArchiveFetcher, IndicatorFetcher, MobilityFetcher};

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Panel assembler bound to a set of transports and a result cache.
///
/// Clones share the cache.
#[derive(Clone)]
pub struct PanelHub {
    archive: Arc<dyn ArchiveFetcher>,
    sources: MergeSources,
    citation: Arc<dyn CitationFormatter>,
    cache: ResultCache,
    clock: Clock,
}

impl fmt::Debug for PanelHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelHub")
            .field("indicators", &self.sources.indicators.is_some())
            .field("google", &self.sources.google.is_some())
            .field("apple", &self.sources.apple.is_some())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl PanelHub {
    /// Create a hub reading snapshots through `archive`.
    ///
    /// No external series are wired in; the cache is fresh and "today" is the
    /// current UTC day.
    pub fn new(archive: Arc<dyn ArchiveFetcher>) -> Self {
        Self {
            archive,
            sources: MergeSources::default(),
            citation: Arc::new(SourceTableCitation),
            cache: ResultCache::new(),
            clock: Arc::new(|| Utc::now().date_naive()),
        }
    }

    /// Wire in the World Bank transport.
    pub fn with_indicators(mut self, fetcher: Arc<dyn IndicatorFetcher>) -> Self {
        self.sources.indicators = Some(fetcher);
        self
    }

    /// Wire in the Google mobility transport.
    pub fn with_google_mobility(mut self, fetcher: Arc<dyn MobilityFetcher>) -> Self {
        self.sources.google = Some(fetcher);
        self
    }

    /// Wire in the Apple mobility transport.
    pub fn with_apple_mobility(mut self, fetcher: Arc<dyn MobilityFetcher>) -> Self {
        self.sources.apple = Some(fetcher);
        self
    }

    /// Replace the citation formatter.
    pub fn with_citation(mut self, citation: Arc<dyn CitationFormatter>) -> Self {
        self.citation = citation;
        self
    }

    /// Use `cache` instead of a private one, e.g. to share it between hubs.
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    /// Replace the source of "today".
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Result cache used by this hub.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Run `request`.
    ///
    /// Returns `Ok(None)` when the location filter matches nothing. Invalid
    /// parameters fail before any transport is called.
    pub fn fetch(&self, request: &PanelRequest) -> Result<Option<PanelDataset>, PanelError> {
        let today = (self.clock)();
        let window = request.window(today)?;
        let vintage = request.resolved_vintage(today);
        let mode = if request.clean_locally {
            CleaningMode::Raw
        } else {
            request.cleaning_mode()
        };
        let location = snapshot::resolve(request.level, mode, vintage, today)?;
        let merges = MergePipeline::for_request(request, &self.sources)?;

        let key = CacheKey::from_request(request, vintage);
        let cached = if request.cache {
            self.cache.get(&key)
        } else {
            None
        };
        let dataset = match cached {
            Some(dataset) => {
                debug!(key = %key, "result cache hit");
                dataset
            }
            None => {
                debug!(key = %key, cache = request.cache, "result cache miss");
                let Some(dataset) = self.build(request, location, &merges)? else {
                    return Ok(None);
                };
                if request.cache {
                    self.cache.insert(key, dataset)
                } else {
                    Arc::new(dataset)
                }
            }
        };

        let windowed = dataset.window(&window);
        if request.verbose {
            report(&windowed);
        }
        Ok(Some(windowed))
    }

    fn build(
        &self,
        request: &PanelRequest,
        location: SnapshotLocation,
        merges: &MergePipeline,
    ) -> Result<Option<PanelDataset>, PanelError> {
        let raw = self.archive.fetch_member(&location.archive, &location.member)?;
        let table = PanelTable::from_raw(&raw, &location.member)?;
        debug!(member = %location.member, rows = table.len(), "snapshot fetched");

        let filter = LocationFilter::new(&request.country);
        let table = filter.apply(table);
        if table.is_empty() {
            debug!(tokens = ?filter.tokens(), "location filter matched no rows");
            return Ok(None);
        }

        let table = if request.clean_locally && !request.raw {
            normalize_grid(table)
        } else {
            table
        };
        let table = merges.run(table, &JoinContext { level: request.level })?;

        let references = merges.references();
        let dataset = assemble(table, location.clone(), |table| {
            let upstream = self
                .archive
                .fetch_member(&location.archive, &location.sources_member)?;
            let sources = SourceMetadata {
                snapshot: location.clone(),
                upstream,
                merges: references,
            };
            self.citation.cite(table, &sources)
        });
        Ok(Some(dataset))
    }
}

fn report(dataset: &PanelDataset) {
    let Some(provenance) = dataset.provenance() else {
        return;
    };
    for citation in &provenance.citations {
        info!(
            kind = ?citation.kind,
            title = %citation.title,
            reference = %citation.reference,
            "panel source"
        );
    }
}
