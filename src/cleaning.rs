//! Grid normalizer.
//!
//! Cleaned snapshots are published pre-normalized; this module implements the
//! same policy so the cleaned grid can also be rebuilt from a raw snapshot:
//!
//! - every location gets one row per day between its first and last observed
//!   day;
//! - each measurement column is filled independently: carry the latest prior
//!   value forward, or use zero when no prior value exists;
//! - location-describing columns (codes, names, coordinates) are carried
//!   forward but never zero-filled.

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::constants::columns;
use crate::data::{CellValue, Observation, PanelTable};
use crate::types::ColumnName;

/// Expand every location to a gap-free daily grid and impute missing values.
///
/// Duplicate `(id, date)` rows keep their first occurrence. Output is ordered
/// by `(id, date)`.
pub fn normalize_grid(mut table: PanelTable) -> PanelTable {
    table.sort_by_location_date();
    table.dedup_location_dates();
    let column_names: Vec<ColumnName> = table.columns().to_vec();

    let mut out = Vec::with_capacity(table.len());
    for group in table.rows().chunk_by(|a, b| a.id == b.id) {
        fill_location(group, &column_names, &mut out);
    }
    table.with_rows(out)
}

fn fill_location(group: &[Observation], column_names: &[ColumnName], out: &mut Vec<Observation>) {
    let (Some(first), Some(last)) = (group.first(), group.last()) else {
        return;
    };
    let observed: IndexMap<NaiveDate, &Observation> =
        group.iter().map(|row| (row.date, row)).collect();
    let mut carried: IndexMap<&str, CellValue> = IndexMap::new();

    for day in first.date.iter_days().take_while(|day| *day <= last.date) {
        let mut row = observed
            .get(&day)
            .map(|row| (*row).clone())
            .unwrap_or_else(|| Observation::new(first.id.clone(), day));
        for column in column_names {
            let cell = row.get(column).cloned().unwrap_or(CellValue::Missing);
            let filled = if cell.is_missing() {
                match carried.get(column.as_str()) {
                    Some(previous) => previous.clone(),
                    None if columns::is_static(column) => CellValue::Missing,
                    None => CellValue::Number(0.0),
                }
            } else {
                carried.insert(column.as_str(), cell.clone());
                cell
            };
            row.set(column.clone(), filled);
        }
        out.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    fn number(row: &Observation, column: &str) -> Option<f64> {
        row.get(column).and_then(CellValue::as_f64)
    }

    #[test]
    fn fills_gaps_with_carry_forward_then_zero() {
        let table = PanelTable::from_rows(vec![
            Observation::new("ITA", day(1))
                .with("confirmed", CellValue::Missing)
                .with("deaths", 1.0),
            Observation::new("ITA", day(4))
                .with("confirmed", 10.0)
                .with("deaths", CellValue::Missing),
            Observation::new("ITA", day(5)).with("confirmed", 12.0),
        ]);
        let cleaned = normalize_grid(table);
        let dates: Vec<NaiveDate> = cleaned.rows().iter().map(|row| row.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3), day(4), day(5)]);

        let confirmed: Vec<Option<f64>> = cleaned.rows().iter().map(|r| number(r, "confirmed")).collect();
        assert_eq!(confirmed, vec![Some(0.0), Some(0.0), Some(0.0), Some(10.0), Some(12.0)]);
        let deaths: Vec<Option<f64>> = cleaned.rows().iter().map(|r| number(r, "deaths")).collect();
        assert_eq!(deaths, vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(1.0)]);
    }

    #[test]
    fn static_columns_are_carried_but_never_zeroed() {
        let table = PanelTable::from_rows(vec![
            Observation::new("ITA", day(1)).with("iso_alpha_3", "ITA"),
            Observation::new("ITA", day(3)).with("iso_alpha_3", CellValue::Missing),
            Observation::new("FRA", day(2)).with("iso_alpha_3", CellValue::Missing),
        ]);
        let cleaned = normalize_grid(table);
        let codes: Vec<(&str, Option<&CellValue>)> = cleaned
            .rows()
            .iter()
            .map(|row| (row.id.as_str(), row.get("iso_alpha_3")))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("FRA", Some(&CellValue::Missing)),
                ("ITA", Some(&CellValue::Text("ITA".into()))),
                ("ITA", Some(&CellValue::Text("ITA".into()))),
                ("ITA", Some(&CellValue::Text("ITA".into()))),
            ]
        );
    }

    #[test]
    fn grids_are_per_location_and_deduplicated() {
        let table = PanelTable::from_rows(vec![
            Observation::new("B", day(2)).with("x", 1.0),
            Observation::new("A", day(1)).with("x", 5.0),
            Observation::new("A", day(1)).with("x", 6.0),
            Observation::new("B", day(3)).with("x", 2.0),
        ]);
        let cleaned = normalize_grid(table);
        let keys: Vec<(&str, NaiveDate, Option<f64>)> = cleaned
            .rows()
            .iter()
            .map(|row| (row.id.as_str(), row.date, number(row, "x")))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("A", day(1), Some(5.0)),
                ("B", day(2), Some(1.0)),
                ("B", day(3), Some(2.0)),
            ]
        );
    }
}
