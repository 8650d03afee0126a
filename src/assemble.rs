//! Assembler.
//!
//! Produces the stored form of a panel: rows ordered by `(id, date)`, unique
//! per `(id, date)`, with provenance attached when it could be built. Date
//! window truncation is a separate step so a stored panel can serve any
//! window.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::DateWindow;
use crate::data::{Observation, PanelTable};
use crate::errors::PanelError;
use crate::provenance::Provenance;
use crate::snapshot::SnapshotLocation;

/// Assembled panel with its snapshot identity and optional provenance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanelDataset {
    table: PanelTable,
    snapshot: SnapshotLocation,
    provenance: Option<Provenance>,
}

impl PanelDataset {
    /// Underlying table.
    pub fn table(&self) -> &PanelTable {
        &self.table
    }

    /// Observations ordered by `(id, date)`.
    pub fn rows(&self) -> &[Observation] {
        self.table.rows()
    }

    /// Snapshot the panel was built from.
    pub fn snapshot(&self) -> &SnapshotLocation {
        &self.snapshot
    }

    /// Contributing sources, when they could be determined.
    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` when there are no observations.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Per-location slices in `id` order, each ordered by date.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[Observation])> {
        self.table
            .rows()
            .chunk_by(|a, b| a.id == b.id)
            .filter_map(|group| group.first().map(|first| (first.id.as_str(), group)))
    }

    /// Copy restricted to `window` (both ends included).
    pub fn window(&self, window: &DateWindow) -> Self {
        Self {
            table: self.table.restricted_to(window),
            snapshot: self.snapshot.clone(),
            provenance: self.provenance.clone(),
        }
    }

    /// Consume the dataset, returning the table.
    pub fn into_table(self) -> PanelTable {
        self.table
    }
}

/// Order, deduplicate, and attach provenance to a merged table.
///
/// `cite` runs after ordering; any error it returns is logged and turned into
/// absent provenance.
pub fn assemble(
    mut table: PanelTable,
    snapshot: SnapshotLocation,
    cite: impl FnOnce(&PanelTable) -> Result<Provenance, PanelError>,
) -> PanelDataset {
    table.sort_by_location_date();
    let dropped = table.dedup_location_dates();
    if dropped > 0 {
        warn!(dropped, "dropped rows repeating an (id, date) pair");
    }
    let provenance = match cite(&table) {
        Ok(provenance) => Some(provenance),
        Err(err) => {
            warn!(error = %err, "provenance unavailable");
            None
        }
    };
    PanelDataset {
        table,
        snapshot,
        provenance,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::config::{CleaningMode, Level, Vintage};
    use crate::snapshot::resolve;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    fn snapshot() -> SnapshotLocation {
        resolve(Level::Country, CleaningMode::Raw, Vintage::Latest, day(20)).unwrap()
    }

    fn table() -> PanelTable {
        PanelTable::from_rows(vec![
            Observation::new("USA", day(2)).with("confirmed", 2.0),
            Observation::new("ITA", day(3)).with("confirmed", 3.0),
            Observation::new("ITA", day(1)).with("confirmed", 1.0),
            Observation::new("ITA", day(1)).with("confirmed", 9.0),
        ])
    }

    #[test]
    fn orders_groups_and_drops_duplicate_keys() {
        let dataset = assemble(table(), snapshot(), |_| Ok(Provenance::default()));
        let groups: Vec<(&str, Vec<NaiveDate>)> = dataset
            .groups()
            .map(|(id, rows)| (id, rows.iter().map(|row| row.date).collect()))
            .collect();
        assert_eq!(
            groups,
            vec![("ITA", vec![day(1), day(3)]), ("USA", vec![day(2)])]
        );
        assert_eq!(
            dataset.rows()[0].get("confirmed").and_then(|value| value.as_f64()),
            Some(1.0)
        );
        assert!(dataset.provenance().is_some());
    }

    #[test]
    fn provenance_failure_is_contained() {
        let dataset = assemble(table(), snapshot(), |_| {
            Err(PanelError::Provenance("formatter exploded".into()))
        });
        assert!(dataset.provenance().is_none());
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn window_is_inclusive_and_preserves_metadata() {
        let dataset = assemble(table(), snapshot(), |_| Ok(Provenance::default()));
        let window = DateWindow::new(day(2), day(3)).unwrap();
        let windowed = dataset.window(&window);
        let dates: Vec<NaiveDate> = windowed.rows().iter().map(|row| row.date).collect();
        assert_eq!(dates, vec![day(3), day(2)]);
        assert_eq!(windowed.snapshot(), dataset.snapshot());
        assert_eq!(windowed.provenance(), dataset.provenance());
    }
}
