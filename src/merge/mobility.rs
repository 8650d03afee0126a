use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{JoinContext, MergeStage, SeriesJoin, claim_column, is_reserved_column};
use crate::constants::columns;
use crate::data::{CellValue, PanelTable};
use crate::errors::PanelError;
use crate::transport::{MobilityFetcher, MobilitySeries};
use crate::types::SourceUrl;

/// Left-joins the Google community mobility report by `(place, date)`.
///
/// Places are aligned through the base table's `key_google_mobility` column.
pub struct GoogleMobilityJoin {
    url: SourceUrl,
    fetcher: Arc<dyn MobilityFetcher>,
}

impl GoogleMobilityJoin {
    /// Create a join reading the report at `url`.
    pub fn new(url: impl Into<SourceUrl>, fetcher: Arc<dyn MobilityFetcher>) -> Self {
        Self {
            url: url.into(),
            fetcher,
        }
    }
}

impl SeriesJoin for GoogleMobilityJoin {
    fn stage(&self) -> MergeStage {
        MergeStage::GoogleMobility
    }

    fn reference(&self) -> String {
        self.url.clone()
    }

    fn join(&self, table: PanelTable, context: &JoinContext) -> Result<PanelTable, PanelError> {
        let series = self.fetcher.fetch_mobility(&self.url, context.level)?;
        left_join_mobility(table, series, columns::KEY_GOOGLE_MOBILITY, self.stage())
    }
}

/// Left-joins the Apple mobility trends report by `(place, date)`.
///
/// Places are aligned through the base table's `key_apple_mobility` column.
pub struct AppleMobilityJoin {
    url: SourceUrl,
    fetcher: Arc<dyn MobilityFetcher>,
}

impl AppleMobilityJoin {
    /// Create a join reading the report at `url`.
    pub fn new(url: impl Into<SourceUrl>, fetcher: Arc<dyn MobilityFetcher>) -> Self {
        Self {
            url: url.into(),
            fetcher,
        }
    }
}

impl SeriesJoin for AppleMobilityJoin {
    fn stage(&self) -> MergeStage {
        MergeStage::AppleMobility
    }

    fn reference(&self) -> String {
        self.url.clone()
    }

    fn join(&self, table: PanelTable, context: &JoinContext) -> Result<PanelTable, PanelError> {
        let series = self.fetcher.fetch_mobility(&self.url, context.level)?;
        left_join_mobility(table, series, columns::KEY_APPLE_MOBILITY, self.stage())
    }
}

/// Attach every category of `series` to `table` by `(place key, date)`.
///
/// The place key of a row is read from `key_column`, or from `id` when the
/// table has no such column. Unmatched rows get missing values. Duplicate
/// report rows keep their first occurrence. A category named `id` or `date`
/// fails the join.
pub fn left_join_mobility(
    mut table: PanelTable,
    series: MobilitySeries,
    key_column: &str,
    stage: MergeStage,
) -> Result<PanelTable, PanelError> {
    let MobilitySeries { categories, points } = series;
    if let Some(category) = categories.iter().find(|category| is_reserved_column(category)) {
        return Err(PanelError::fetch(
            stage.to_string(),
            format!("report category '{category}' collides with a reserved column"),
        ));
    }
    let mut index: HashMap<(&str, NaiveDate), &[Option<f64>]> = HashMap::with_capacity(points.len());
    let mut duplicates = 0usize;
    for point in &points {
        match index.entry((point.key.as_str(), point.date)) {
            Entry::Occupied(_) => duplicates += 1,
            Entry::Vacant(slot) => {
                slot.insert(point.values.as_slice());
            }
        }
    }
    if duplicates > 0 {
        warn!(stage = %stage, duplicates, "mobility report repeats (place, date) rows; keeping first");
    }

    for category in &categories {
        claim_column(&mut table, category, stage);
    }
    let keyed_by_column = table.has_column(key_column);
    let mut matched = 0usize;
    for row in table.rows_mut() {
        let key = if keyed_by_column {
            row.text(key_column)
        } else {
            Some(row.id.clone())
        };
        let values = key
            .as_deref()
            .and_then(|key| index.get(&(key, row.date)).copied());
        if values.is_some() {
            matched += 1;
        }
        for (idx, category) in categories.iter().enumerate() {
            let value = values.and_then(|values| values.get(idx).copied().flatten());
            row.set(category.clone(), CellValue::from(value));
        }
    }
    debug!(stage = %stage, matched, categories = categories.len(), "mobility joined");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Level;
    use crate::data::Observation;
    use crate::transport::{MobilityPoint, StaticMobility};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    fn series() -> MobilitySeries {
        MobilitySeries {
            categories: vec!["parks".into(), "transit".into()],
            points: vec![
                MobilityPoint {
                    key: "IT".into(),
                    date: day(1),
                    values: vec![Some(-5.0), None],
                },
                MobilityPoint {
                    key: "IT".into(),
                    date: day(1),
                    values: vec![Some(99.0), Some(99.0)],
                },
                MobilityPoint {
                    key: "FR".into(),
                    date: day(2),
                    values: vec![Some(1.0), Some(2.0)],
                },
            ],
        }
    }

    #[test]
    fn left_join_matches_on_key_column_and_keeps_first_duplicate() {
        let table = PanelTable::from_rows(vec![
            Observation::new("ITA", day(1)).with("key_google_mobility", "IT"),
            Observation::new("ITA", day(2)).with("key_google_mobility", "IT"),
            Observation::new("FRA", day(2)).with("key_google_mobility", CellValue::Missing),
        ]);
        let joined =
            left_join_mobility(table, series(), "key_google_mobility", MergeStage::GoogleMobility).unwrap();
        let parks: Vec<Option<f64>> = joined
            .rows()
            .iter()
            .map(|row| row.get("parks").and_then(CellValue::as_f64))
            .collect();
        assert_eq!(parks, vec![Some(-5.0), None, None]);
        assert_eq!(joined.rows()[0].get("transit"), Some(&CellValue::Missing));
        assert_eq!(joined.rows().len(), 3);
    }

    #[test]
    fn falls_back_to_id_when_key_column_absent() {
        let table = PanelTable::from_rows(vec![Observation::new("FR", day(2))]);
        let joined =
            left_join_mobility(table, series(), "key_apple_mobility", MergeStage::AppleMobility).unwrap();
        assert_eq!(
            joined.rows()[0].get("transit"),
            Some(&CellValue::Number(2.0))
        );
    }

    #[test]
    fn reserved_category_fails_the_join() {
        let mut report = series();
        report.categories.push("date".into());
        let table = PanelTable::from_rows(vec![Observation::new("FR", day(2))]);
        let err = left_join_mobility(table, report, "key_google_mobility", MergeStage::GoogleMobility)
            .unwrap_err();
        assert!(matches!(err, PanelError::Fetch { .. }));
    }

    #[test]
    fn google_join_fetches_at_request_level() {
        let fetcher = Arc::new(StaticMobility::new().with_report("gmr", Level::State, series()));
        let join = GoogleMobilityJoin::new("gmr", fetcher.clone());
        let table = PanelTable::from_rows(vec![Observation::new("FR", day(2))]);
        assert!(join.join(table.clone(), &JoinContext { level: Level::State }).is_ok());
        assert!(join.join(table, &JoinContext { level: Level::Country }).is_err());
        assert_eq!(fetcher.fetch_count(), 2);
    }
}
