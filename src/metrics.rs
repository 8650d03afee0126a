use crate::assemble::PanelDataset;
use crate::config::DateWindow;
use crate::types::ColumnName;

/// Coverage overview of an assembled panel.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelSummary {
    pub locations: usize,
    pub rows: usize,
    pub span: Option<DateWindow>,
    pub per_column: Vec<ColumnCoverage>,
}

/// Share of rows with no value in one column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnCoverage {
    pub column: ColumnName,
    pub missing: usize,
    pub missing_share: f64,
}

/// Summarize row counts, date span and per-column missing shares.
/// Columns keep table order; a row without the column counts as missing.
pub fn panel_summary(dataset: &PanelDataset) -> PanelSummary {
    let table = dataset.table();
    let rows = table.len();
    let per_column = table
        .columns()
        .iter()
        .map(|column| {
            let missing = table
                .rows()
                .iter()
                .filter(|row| row.get(column).is_none_or(|cell| cell.is_missing()))
                .count();
            ColumnCoverage {
                column: column.clone(),
                missing,
                missing_share: if rows == 0 {
                    0.0
                } else {
                    missing as f64 / rows as f64
                },
            }
        })
        .collect();
    PanelSummary {
        locations: dataset.groups().count(),
        rows,
        span: table.date_span(),
        per_column,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::assemble::assemble;
    use crate::config::{CleaningMode, Level, Vintage};
    use crate::data::{CellValue, Observation, PanelTable};
    use crate::provenance::Provenance;
    use crate::snapshot::resolve;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, d).unwrap()
    }

    #[test]
    fn panel_summary_reports_coverage() {
        let table = PanelTable::from_rows(vec![
            Observation::new("ITA", day(1)).with("confirmed", 1.0).with("tests", CellValue::Missing),
            Observation::new("ITA", day(2)).with("confirmed", 2.0),
            Observation::new("FRA", day(3)).with("confirmed", 3.0).with("tests", 9.0),
            Observation::new("FRA", day(4)).with("confirmed", CellValue::Missing).with("tests", 9.0),
        ]);
        let snapshot = resolve(Level::Country, CleaningMode::Raw, Vintage::Latest, day(10)).unwrap();
        let dataset = assemble(table, snapshot, |_| Ok(Provenance::default()));

        let summary = panel_summary(&dataset);
        assert_eq!(summary.locations, 2);
        assert_eq!(summary.rows, 4);
        let span = summary.span.expect("span");
        assert_eq!((span.start, span.end), (day(1), day(4)));

        assert_eq!(summary.per_column[0].column, "confirmed");
        assert_eq!(summary.per_column[0].missing, 1);
        assert!((summary.per_column[0].missing_share - 0.25).abs() < 1e-9);
        assert_eq!(summary.per_column[1].column, "tests");
        assert_eq!(summary.per_column[1].missing, 2);
    }

    #[test]
    fn panel_summary_of_empty_window() {
        let table = PanelTable::from_rows(vec![Observation::new("ITA", day(1)).with("confirmed", 1.0)]);
        let snapshot = resolve(Level::Country, CleaningMode::Raw, Vintage::Latest, day(10)).unwrap();
        let dataset = assemble(table, snapshot, |_| Ok(Provenance::default()))
            .window(&DateWindow::new(day(5), day(6)).unwrap());
        let summary = panel_summary(&dataset);
        assert_eq!((summary.locations, summary.rows), (0, 0));
        assert!(summary.span.is_none());
        assert_eq!(summary.per_column[0].missing_share, 0.0);
    }
}
