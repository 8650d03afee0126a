use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use indexmap::IndexMap;
use tracing::debug;

use super::{JoinContext, MergeStage, SeriesJoin, claim_column, is_reserved_column};
use crate::config::DateWindow;
use crate::constants::columns;
use crate::constants::indicators::LOOKBACK_START;
use crate::data::{CellValue, PanelTable};
use crate::errors::PanelError;
use crate::transport::{IndicatorFetcher, IndicatorPoint};
use crate::types::{IndicatorAlias, IndicatorCode};
use crate::utils::normalize_token;

/// Attaches World Bank indicators as constant per-location columns.
///
/// For every location the most recent non-missing value reported inside the
/// lookup window is used. The window runs from `LOOKBACK_START` to the last
/// day of the base table, so it depends only on the table itself and not on
/// the caller's date window.
///
/// A stored full panel therefore serves every window, but a value reported
/// after the requested `end` (and no later than the table's last day) can be
/// attached to rows inside that window. Callers needing strict "as of `end`"
/// indicators should request `end` equal to the panel's last day or bypass
/// the cache and truncate the snapshot first.
///
/// Aliases `id` and `date` are rejected with `PanelError::Configuration`.
pub struct WorldBankJoin {
    indicators: IndexMap<IndicatorAlias, IndicatorCode>,
    fetcher: Arc<dyn IndicatorFetcher>,
}

impl WorldBankJoin {
    /// Create a join attaching each `alias -> code` pair.
    pub fn new(
        indicators: IndexMap<IndicatorAlias, IndicatorCode>,
        fetcher: Arc<dyn IndicatorFetcher>,
    ) -> Self {
        Self {
            indicators,
            fetcher,
        }
    }
}

impl SeriesJoin for WorldBankJoin {
    fn stage(&self) -> MergeStage {
        MergeStage::WorldBank
    }

    fn reference(&self) -> String {
        self.indicators
            .iter()
            .map(|(alias, code)| format!("{alias}={code}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn join(&self, table: PanelTable, _context: &JoinContext) -> Result<PanelTable, PanelError> {
        if let Some(alias) = self.indicators.keys().find(|alias| is_reserved_column(alias)) {
            return Err(PanelError::Configuration(format!(
                "indicator alias '{alias}' collides with a reserved column"
            )));
        }
        let Some(span) = table.date_span() else {
            return Ok(table);
        };
        let window = lookup_window(&span);
        let mut table = table;
        for (alias, code) in &self.indicators {
            let points = self.fetcher.fetch_indicator(code, &window)?;
            let latest = latest_by_location(&points, &window);
            claim_column(&mut table, alias, MergeStage::WorldBank);
            let mut matched = 0usize;
            for row in table.rows_mut() {
                let value = row
                    .text(columns::ISO_ALPHA_3)
                    .and_then(|iso| latest.get(&normalize_token(iso)).copied());
                if value.is_some() {
                    matched += 1;
                }
                row.set(alias.clone(), CellValue::from(value));
            }
            debug!(indicator = %code, column = %alias, matched, "indicator attached");
        }
        Ok(table)
    }
}

fn lookup_window(span: &DateWindow) -> DateWindow {
    let (year, month, day) = LOOKBACK_START;
    let lookback = NaiveDate::from_ymd_opt(year, month, day).unwrap_or(span.start);
    DateWindow {
        start: lookback.min(span.start),
        end: span.end,
    }
}

/// Most recent non-missing value per country inside `window`.
///
/// Keys are normalized ISO alpha-3 codes. Ties on the same day keep the first
/// point.
pub fn latest_by_location(points: &[IndicatorPoint], window: &DateWindow) -> HashMap<String, f64> {
    let mut best: HashMap<String, (NaiveDate, f64)> = HashMap::new();
    for point in points {
        let Some(value) = point.value else {
            continue;
        };
        if !window.contains(point.date) {
            continue;
        }
        let key = normalize_token(&point.iso_alpha_3);
        match best.get(&key) {
            Some((date, _)) if *date >= point.date => {}
            _ => {
                best.insert(key, (point.date, value));
            }
        }
    }
    best.into_iter()
        .map(|(key, (_, value))| (key, value))
        .collect()
}
