#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Assembler and the assembled panel type.
pub mod assemble;
/// Result cache keyed by content-shaping request parameters.
pub mod cache;
/// Grid normalizer for cleaned snapshots.
pub mod cleaning;
/// Request configuration types.
pub mod config;
/// Centralized constants for archives, columns, and defaults.
pub mod constants;
/// Cell, observation, and table types.
pub mod data;
/// Reusable example runners shared by downstream crates.
pub mod example_apps;
mod hash;
/// Location filter.
pub mod location;
/// External merge stage.
pub mod merge;
/// Coverage metrics helpers.
pub mod metrics;
/// Top-level request pipeline.
pub mod pipeline;
/// Provenance records and citation formatting.
pub mod provenance;
/// Snapshot locator.
pub mod snapshot;
/// Archive and series transports (in-memory and local directory today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;

mod errors;

pub use assemble::{PanelDataset, assemble};
pub use cache::{CacheKey, ResultCache};
pub use cleaning::normalize_grid;
pub use config::{CleaningMode, DateWindow, Level, PanelRequest, Vintage};
pub use data::{CellValue, Observation, PanelTable, RawTable};
pub use errors::PanelError;
pub use location::LocationFilter;
pub use merge::{
    AppleMobilityJoin, GoogleMobilityJoin, JoinContext, MergePipeline, MergeSources, MergeStage,
    SeriesJoin, WorldBankJoin,
};
pub use metrics::{ColumnCoverage, PanelSummary, panel_summary};
pub use pipeline::PanelHub;
pub use provenance::{
    Citation, CitationFormatter, ContributorKind, Provenance, SourceMetadata, SourceTableCitation,
};
pub use snapshot::{ArchiveRef, SnapshotId, SnapshotLocation};
pub use transport::{
    ArchiveFetcher, DirectoryArchive, InMemoryArchive, IndicatorFetcher, IndicatorPoint,
    JsonlIndicatorFeed, JsonlMobilityFeed, MobilityFetcher, MobilityPoint, MobilitySeries,
    StaticIndicators, StaticMobility,
};
pub use types::{
    ColumnName, IndicatorAlias, IndicatorCode, LocationId, LocationToken, MemberName, MobilityKey,
    SourceUrl,
};
