//! Provenance records attached to assembled panels.
//!
//! Provenance is best-effort metadata: building it may fail, and callers of
//! the pipeline only ever see `Option<Provenance>`.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::constants::columns;
use crate::data::{PanelTable, RawTable};
use crate::errors::PanelError;
use crate::merge::MergeStage;
use crate::snapshot::SnapshotLocation;
use crate::utils::normalize_token;

/// Kind of contributor a citation refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContributorKind {
    /// The base snapshot archive.
    Snapshot,
    /// A source the snapshot provider collected from.
    Upstream,
    /// An external series merged into the panel.
    Merge(MergeStage),
}

/// One cited source.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    /// What kind of contributor this is.
    pub kind: ContributorKind,
    /// Human-readable source title.
    pub title: String,
    /// URL, indicator list, or other locator.
    pub reference: String,
}

/// Sources that contributed to a panel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Citations in output order: snapshot, upstream sources, merged series.
    pub citations: Vec<Citation>,
}

impl Provenance {
    /// Returns `true` when nothing is cited.
    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    /// Citations of the given kind.
    pub fn of_kind(&self, kind: ContributorKind) -> impl Iterator<Item = &Citation> {
        self.citations
            .iter()
            .filter(move |citation| citation.kind == kind)
    }
}

/// Everything a citation formatter may cite.
#[derive(Clone, Debug)]
pub struct SourceMetadata {
    /// Resolved base snapshot.
    pub snapshot: SnapshotLocation,
    /// Upstream source-citation table shipped with the snapshot archive.
    pub upstream: RawTable,
    /// Merged external series as `(stage, reference)`, in merge order.
    pub merges: Vec<(MergeStage, String)>,
}

/// Turns a panel and its source metadata into a provenance record.
pub trait CitationFormatter: Send + Sync {
    /// Build the provenance of `table`. May fail; failures are never fatal.
    fn cite(&self, table: &PanelTable, sources: &SourceMetadata) -> Result<Provenance, PanelError>;
}

/// Default formatter driven by the archive's source-citation table.
///
/// An upstream entry is cited when its `iso_alpha_3` occurs in the panel,
/// its `administrative_area_level` equals the snapshot level, and its
/// `data_type` names a panel column. Empty fields in the entry match anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceTableCitation;

impl CitationFormatter for SourceTableCitation {
    fn cite(&self, table: &PanelTable, sources: &SourceMetadata) -> Result<Provenance, PanelError> {
        let upstream = &sources.upstream;
        for required in ["title", "url"] {
            if upstream.column_index(required).is_none() {
                return Err(PanelError::Provenance(format!(
                    "source table has no '{required}' column"
                )));
            }
        }

        let countries: IndexSet<String> = table
            .rows()
            .iter()
            .filter_map(|row| row.text(columns::ISO_ALPHA_3))
            .map(normalize_token)
            .collect();
        let level = sources.snapshot.id.level.to_string();

        let mut citations: IndexSet<Citation> = IndexSet::new();
        citations.insert(Citation {
            kind: ContributorKind::Snapshot,
            title: "COVID-19 Data Hub".to_string(),
            reference: format!(
                "{} ({})",
                sources.snapshot.archive.url(),
                sources.snapshot.member
            ),
        });
        for row in 0..upstream.len() {
            let field = |column: &str| upstream.cell(row, column).map(str::trim).filter(|v| !v.is_empty());
            let country_ok = field(columns::ISO_ALPHA_3)
                .is_none_or(|iso| countries.contains(&normalize_token(iso)));
            let level_ok = field(columns::ADMIN_AREA_LEVEL).is_none_or(|value| value == level);
            let column_ok = field(columns::DATA_TYPE).is_none_or(|column| table.has_column(column));
            if !(country_ok && level_ok && column_ok) {
                continue;
            }
            let (Some(title), Some(url)) = (field("title"), field("url")) else {
                continue;
            };
            citations.insert(Citation {
                kind: ContributorKind::Upstream,
                title: title.to_string(),
                reference: url.to_string(),
            });
        }
        for (stage, reference) in &sources.merges {
            citations.insert(Citation {
                kind: ContributorKind::Merge(*stage),
                title: merge_title(*stage).to_string(),
                reference: reference.clone(),
            });
        }
        Ok(Provenance {
            citations: citations.into_iter().collect(),
        })
    }
}

fn merge_title(stage: MergeStage) -> &'static str {
    match stage {
        MergeStage::WorldBank => "World Bank Open Data",
        MergeStage::GoogleMobility => "Google COVID-19 Community Mobility Reports",
        MergeStage::AppleMobility => "Apple COVID-19 Mobility Trends Reports",
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::config::{CleaningMode, Level, Vintage};
    use crate::data::Observation;
    use crate::snapshot::resolve;

    fn metadata(upstream: RawTable) -> SourceMetadata {
        let today = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        SourceMetadata {
            snapshot: resolve(Level::Country, CleaningMode::Cleaned, Vintage::Latest, today).unwrap(),
            upstream,
            merges: vec![(MergeStage::GoogleMobility, "gmr.csv".into())],
        }
    }

    fn table() -> PanelTable {
        PanelTable::from_rows(vec![
            Observation::new("ITA", NaiveDate::from_ymd_opt(2020, 3, 1).unwrap())
                .with("iso_alpha_3", "ITA")
                .with("confirmed", 1.0),
        ])
    }

    #[test]
    fn cites_matching_upstream_entries_between_snapshot_and_merges() {
        let mut upstream = RawTable::new([
            "iso_alpha_3",
            "administrative_area_level",
            "data_type",
            "title",
            "url",
        ]);
        upstream.push_row([Some("ITA"), Some("1"), Some("confirmed"), Some("Protezione Civile"), Some("https://pc.it")]);
        upstream.push_row([Some("ITA"), Some("2"), Some("confirmed"), Some("Regional"), Some("https://r.it")]);
        upstream.push_row([Some("FRA"), Some("1"), Some("confirmed"), Some("Sante"), Some("https://f.fr")]);
        upstream.push_row([None, None, Some("stringency_index"), Some("OxCGRT"), Some("https://ox.ac.uk")]);
        upstream.push_row([None, None, None, Some("Global"), Some("https://g.org")]);

        let provenance = SourceTableCitation.cite(&table(), &metadata(upstream)).unwrap();
        let titles: Vec<&str> = provenance
            .citations
            .iter()
            .map(|citation| citation.title.as_str())
            .collect();
        assert_eq!(
            titles,
            vec![
                "COVID-19 Data Hub",
                "Protezione Civile",
                "Global",
                "Google COVID-19 Community Mobility Reports",
            ]
        );
        assert_eq!(provenance.of_kind(ContributorKind::Upstream).count(), 2);
    }

    #[test]
    fn malformed_source_table_is_an_error() {
        let upstream = RawTable::new(["iso_alpha_3", "title"]);
        assert!(matches!(
            SourceTableCitation.cite(&table(), &metadata(upstream)),
            Err(PanelError::Provenance(_))
        ));
    }
}
