use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use super::{
    ArchiveFetcher, IndicatorFetcher, IndicatorPoint, MobilityFetcher, MobilitySeries,
};
use crate::config::{DateWindow, Level};
use crate::data::RawTable;
use crate::errors::PanelError;
use crate::snapshot::ArchiveRef;
use crate::types::{IndicatorCode, MemberName, SourceUrl};

/// Archive transport backed by tables held in memory.
///
/// Counts every fetch so callers can verify when the transport was skipped.
#[derive(Default)]
pub struct InMemoryArchive {
    members: RwLock<HashMap<(String, MemberName), RawTable>>,
    fetches: AtomicUsize,
}

impl InMemoryArchive {
    /// Create an archive store with no archives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `table` as `member` of `archive`, replacing any previous table.
    pub fn insert(&self, archive: &ArchiveRef, member: impl Into<MemberName>, table: RawTable) {
        self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((archive.name(), member.into()), table);
    }

    /// Number of `fetch_member` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl ArchiveFetcher for InMemoryArchive {
    fn fetch_member(&self, archive: &ArchiveRef, member: &str) -> Result<RawTable, PanelError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
        let name = archive.name();
        if let Some(table) = members.get(&(name.clone(), member.to_string())) {
            return Ok(table.clone());
        }
        if members.keys().any(|(archive_name, _)| *archive_name == name) {
            return Err(PanelError::NotFound {
                archive: name,
                member: member.to_string(),
            });
        }
        Err(PanelError::fetch(archive.url(), "archive is not published"))
    }
}

/// Indicator transport serving fixed series.
#[derive(Default)]
pub struct StaticIndicators {
    series: HashMap<IndicatorCode, Vec<IndicatorPoint>>,
    fetches: AtomicUsize,
}

impl StaticIndicators {
    /// Create a transport with no indicators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `points` for indicator `code`.
    pub fn with_series(mut self, code: impl Into<IndicatorCode>, points: Vec<IndicatorPoint>) -> Self {
        self.series.insert(code.into(), points);
        self
    }

    /// Number of `fetch_indicator` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl IndicatorFetcher for StaticIndicators {
    fn fetch_indicator(
        &self,
        code: &str,
        window: &DateWindow,
    ) -> Result<Vec<IndicatorPoint>, PanelError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let points = self
            .series
            .get(code)
            .ok_or_else(|| PanelError::fetch(code, "unknown indicator"))?;
        Ok(points
            .iter()
            .filter(|point| window.contains(point.date))
            .cloned()
            .collect())
    }
}

/// Mobility transport serving fixed reports per `(url, level)`.
#[derive(Default)]
pub struct StaticMobility {
    reports: HashMap<(SourceUrl, Level), MobilitySeries>,
    fetches: AtomicUsize,
}

impl StaticMobility {
    /// Create a transport with no reports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `series` for `url` at `level`.
    pub fn with_report(mut self, url: impl Into<SourceUrl>, level: Level, series: MobilitySeries) -> Self {
        self.reports.insert((url.into(), level), series);
        self
    }

    /// Number of `fetch_mobility` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl MobilityFetcher for StaticMobility {
    fn fetch_mobility(&self, url: &str, level: Level) -> Result<MobilitySeries, PanelError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.reports
            .get(&(url.to_string(), level))
            .cloned()
            .ok_or_else(|| PanelError::fetch(url, format!("no report at level {level}")))
    }
}
