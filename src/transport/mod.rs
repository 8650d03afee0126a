//! Collaborator interfaces for retrieving archives and external series.
//!
//! The core never downloads or decompresses anything itself. It asks these
//! traits for tables and series, and ships two implementations: in-memory
//! fixtures and a local directory of JSON Lines files.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{DateWindow, Level};
use crate::data::RawTable;
use crate::errors::PanelError;
use crate::snapshot::ArchiveRef;
use crate::types::{ColumnName, MobilityKey};

/// Local-directory transports.
pub mod fs;
/// In-memory transports for tests and embedding.
pub mod memory;

pub use fs::{DirectoryArchive, JsonlIndicatorFeed, JsonlMobilityFeed};
pub use memory::{InMemoryArchive, StaticIndicators, StaticMobility};

/// Reads members out of snapshot archives.
pub trait ArchiveFetcher: Send + Sync {
    /// Return member `member` of `archive` as an untyped table.
    ///
    /// Fails with `PanelError::Fetch` when the archive cannot be retrieved and
    /// `PanelError::NotFound` when it has no such member.
    fn fetch_member(&self, archive: &ArchiveRef, member: &str) -> Result<RawTable, PanelError>;
}

/// One reported value of a World Bank indicator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    /// ISO 3166-1 alpha-3 code of the reporting country.
    pub iso_alpha_3: String,
    /// Reporting day (annual series use January 1st of the year).
    pub date: NaiveDate,
    /// Reported value; `None` when the provider lists the year without data.
    pub value: Option<f64>,
}

/// Retrieves World Bank indicator series.
pub trait IndicatorFetcher: Send + Sync {
    /// Return the points of indicator `code` reported within `window`.
    fn fetch_indicator(
        &self,
        code: &str,
        window: &DateWindow,
    ) -> Result<Vec<IndicatorPoint>, PanelError>;
}

/// One `(place, date)` row of a mobility report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MobilityPoint {
    /// Provider-specific place key.
    pub key: MobilityKey,
    /// Report day.
    pub date: NaiveDate,
    /// Values aligned with `MobilitySeries::categories`.
    pub values: Vec<Option<f64>>,
}

/// Mobility report at one granularity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MobilitySeries {
    /// Category column names, in output order.
    pub categories: Vec<ColumnName>,
    /// Report rows.
    pub points: Vec<MobilityPoint>,
}

/// Retrieves mobility reports.
pub trait MobilityFetcher: Send + Sync {
    /// Return the report found at `url`, encoded at granularity `level`.
    fn fetch_mobility(&self, url: &str, level: Level) -> Result<MobilitySeries, PanelError>;
}
