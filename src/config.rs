use std::fmt;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::request::DEFAULT_START;
use crate::errors::PanelError;
use crate::types::{IndicatorAlias, IndicatorCode, LocationToken, SourceUrl};

/// Administrative granularity of a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    /// Country-level data (`1`).
    Country,
    /// State/region-level data (`2`).
    State,
    /// City/county-level data (`3`).
    City,
}

impl Level {
    /// Numeric level as used in archive member names.
    pub const fn as_u8(self) -> u8 {
        match self {
            Level::Country => 1,
            Level::State => 2,
            Level::City => 3,
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = PanelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::Country),
            2 => Ok(Level::State),
            3 => Ok(Level::City),
            other => Err(PanelError::Configuration(format!(
                "level must be 1, 2 or 3 (got {other})"
            ))),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Whether the snapshot is served as collected or gap-filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CleaningMode {
    /// Values exactly as collected; gaps stay missing.
    Raw,
    /// Complete daily grid with carry-forward then zero imputation.
    Cleaned,
}

impl CleaningMode {
    /// Map the `raw` request flag to a cleaning mode.
    pub fn from_raw_flag(raw: bool) -> Self {
        if raw {
            CleaningMode::Raw
        } else {
            CleaningMode::Cleaned
        }
    }
}

/// Which archive vintage to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vintage {
    /// Continuously updated snapshot; may change between days.
    Latest,
    /// Immutable snapshot archived on the given day.
    ArchivedOn(NaiveDate),
}

impl Vintage {
    /// Marker used in cache keys: `0` for latest, otherwise the ISO date.
    pub fn marker(&self) -> String {
        match self {
            Vintage::Latest => "0".to_string(),
            Vintage::ArchivedOn(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Inclusive calendar-day window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    /// First included day.
    pub start: NaiveDate,
    /// Last included day.
    pub end: NaiveDate,
}

impl DateWindow {
    /// Create a window, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PanelError> {
        if start > end {
            return Err(PanelError::Configuration(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// True when `date` lies inside the window (both ends included).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Parameters of one panel request.
///
/// Everything except `start`, `end`, `cache` and `verbose` influences the
/// content of the assembled (un-windowed) panel and therefore its cache key.
#[derive(Clone, Debug)]
pub struct PanelRequest {
    /// Location tokens (names or codes); empty means every location.
    pub country: Vec<LocationToken>,
    /// Administrative granularity.
    pub level: Level,
    /// First day of the returned window.
    pub start: NaiveDate,
    /// Last day of the returned window; `None` resolves to today.
    pub end: Option<NaiveDate>,
    /// Return raw data instead of the cleaned grid.
    pub raw: bool,
    /// Read the immutable archive dated `end` instead of the latest snapshot.
    pub vintage: bool,
    /// Read from and write to the result cache.
    pub cache: bool,
    /// Surface provenance through the log as soon as the panel is returned.
    pub verbose: bool,
    /// World Bank indicators keyed by the column name they are attached under.
    pub wb: IndexMap<IndicatorAlias, IndicatorCode>,
    /// Google mobility report location.
    pub gmr: Option<SourceUrl>,
    /// Apple mobility report location.
    pub amr: Option<SourceUrl>,
    /// Fetch the raw snapshot and build the cleaned grid in-process.
    pub clean_locally: bool,
}

impl Default for PanelRequest {
    fn default() -> Self {
        let (year, month, day) = DEFAULT_START;
        Self {
            country: Vec::new(),
            level: Level::Country,
            start: NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN),
            end: None,
            raw: false,
            vintage: false,
            cache: true,
            verbose: true,
            wb: IndexMap::new(),
            gmr: None,
            amr: None,
            clean_locally: false,
        }
    }
}

impl PanelRequest {
    /// Restrict the panel to locations matching any of `tokens`.
    pub fn with_country<I, T>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<LocationToken>,
    {
        self.country = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Set the administrative granularity.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the returned date window.
    pub fn with_window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = start;
        self.end = Some(end);
        self
    }

    /// Toggle raw mode.
    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Toggle vintage mode.
    pub fn with_vintage(mut self, vintage: bool) -> Self {
        self.vintage = vintage;
        self
    }

    /// Toggle result caching.
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Toggle provenance logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Attach World Bank indicator `code` under column `alias`.
    pub fn with_indicator(
        mut self,
        alias: impl Into<IndicatorAlias>,
        code: impl Into<IndicatorCode>,
    ) -> Self {
        self.wb.insert(alias.into(), code.into());
        self
    }

    /// Merge the Google mobility report found at `url`.
    pub fn with_google_mobility(mut self, url: impl Into<SourceUrl>) -> Self {
        self.gmr = Some(url.into());
        self
    }

    /// Merge the Apple mobility report found at `url`.
    pub fn with_apple_mobility(mut self, url: impl Into<SourceUrl>) -> Self {
        self.amr = Some(url.into());
        self
    }

    /// Toggle in-process cleaning of the raw snapshot.
    pub fn with_clean_locally(mut self, clean_locally: bool) -> Self {
        self.clean_locally = clean_locally;
        self
    }

    /// Cleaning mode requested by the `raw` flag.
    pub fn cleaning_mode(&self) -> CleaningMode {
        CleaningMode::from_raw_flag(self.raw)
    }

    /// Resolve the returned window, defaulting `end` to `today`.
    pub fn window(&self, today: NaiveDate) -> Result<DateWindow, PanelError> {
        DateWindow::new(self.start, self.end.unwrap_or(today))
    }

    /// Resolve the vintage selected by `vintage` and `end`.
    pub fn resolved_vintage(&self, today: NaiveDate) -> Vintage {
        if self.vintage {
            Vintage::ArchivedOn(self.end.unwrap_or(today))
        } else {
            Vintage::Latest
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_accepts_only_known_granularities() {
        assert_eq!(Level::try_from(1).unwrap(), Level::Country);
        assert_eq!(Level::try_from(3).unwrap(), Level::City);
        assert!(matches!(
            Level::try_from(0),
            Err(PanelError::Configuration(_))
        ));
        assert!(matches!(
            Level::try_from(4),
            Err(PanelError::Configuration(_))
        ));
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        let start = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();
        let request = PanelRequest::default().with_window(start, end);
        assert!(matches!(
            request.window(end),
            Err(PanelError::Configuration(_))
        ));
    }

    #[test]
    fn end_defaults_to_today() {
        let today = NaiveDate::from_ymd_opt(2022, 6, 30).unwrap();
        let window = PanelRequest::default().window(today).unwrap();
        assert_eq!(window.end, today);
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
        assert!(window.contains(today));
        assert!(!window.contains(today.succ_opt().unwrap()));
    }

    #[test]
    fn vintage_marker_distinguishes_latest() {
        let day = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        assert_eq!(Vintage::Latest.marker(), "0");
        assert_eq!(Vintage::ArchivedOn(day).marker(), "2020-05-01");
        let request = PanelRequest::default().with_window(day, day).with_vintage(true);
        assert_eq!(request.resolved_vintage(day), Vintage::ArchivedOn(day));
    }
}
