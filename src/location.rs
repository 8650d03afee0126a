//! Location filter.
//!
//! Keeps the rows whose `id` or any identifier column matches a requested
//! token, so names and ISO codes can be mixed in one request.

use std::collections::HashSet;

use crate::constants::columns;
use crate::data::{Observation, PanelTable};
use crate::types::LocationToken;
use crate::utils::{canonical_tokens, normalize_token};

/// Case-insensitive location filter over every identifier column.
///
/// A row is kept when any token equals any of `id`, `iso_alpha_3`,
/// `iso_alpha_2`, `iso_numeric` or `administrative_area_level_1`, so code
/// schemes can be mixed in one query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocationFilter {
    tokens: HashSet<String>,
}

impl LocationFilter {
    /// Build a filter from user tokens; blank tokens are ignored.
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            tokens: canonical_tokens(tokens).into_iter().collect(),
        }
    }

    /// Returns `true` when the filter lets every row through.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Normalized tokens in sorted order.
    pub fn tokens(&self) -> Vec<LocationToken> {
        let mut tokens: Vec<LocationToken> = self.tokens.iter().cloned().collect();
        tokens.sort();
        tokens
    }

    /// Returns `true` when `row` matches any token in any identifier column.
    pub fn matches(&self, row: &Observation) -> bool {
        if self.is_empty() {
            return true;
        }
        std::iter::once(columns::ID)
            .chain(columns::LOOKUP_COLUMNS)
            .filter_map(|column| row.text(column))
            .any(|value| self.tokens.contains(&normalize_token(value)))
    }

    /// Keep the rows of `table` that match.
    pub fn apply(&self, mut table: PanelTable) -> PanelTable {
        if !self.is_empty() {
            table.retain(|row| self.matches(row));
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn row(id: &str, iso3: &str, iso2: &str, numeric: &str, name: &str) -> Observation {
        Observation::new(id, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap())
            .with("iso_alpha_3", iso3)
            .with("iso_alpha_2", iso2)
            .with("iso_numeric", numeric)
            .with("administrative_area_level_1", name)
    }

    fn table() -> PanelTable {
        PanelTable::from_rows(vec![
            row("ITA", "ITA", "IT", "380", "Italy"),
            row("USA", "USA", "US", "840", "United States"),
            row("FRA", "FRA", "FR", "250", "France"),
        ])
    }

    fn ids(table: &PanelTable) -> Vec<&str> {
        table.rows().iter().map(|row| row.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filtered = LocationFilter::new(Vec::<String>::new()).apply(table());
        assert_eq!(filtered.len(), 3);
        let blanks = LocationFilter::new(["  "]);
        assert!(blanks.is_empty());
    }

    #[test]
    fn tokens_match_any_identifier_scheme_case_insensitively() {
        assert_eq!(ids(&LocationFilter::new(["it", "US"]).apply(table())), vec!["ITA", "USA"]);
        assert_eq!(ids(&LocationFilter::new(["italy", "840"]).apply(table())), vec!["ITA", "USA"]);
        assert_eq!(ids(&LocationFilter::new(["fra"]).apply(table())), vec!["FRA"]);
        assert_eq!(
            ids(&LocationFilter::new([" united   states"]).apply(table())),
            vec!["USA"]
        );
    }

    #[test]
    fn unmatched_tokens_yield_empty_table() {
        let filtered = LocationFilter::new(["Atlantis"]).apply(table());
        assert!(filtered.is_empty());
        assert_eq!(filtered.columns().len(), 4);
    }

    #[test]
    fn tokens_are_reported_sorted() {
        let filter = LocationFilter::new(["us", "it", "US"]);
        assert_eq!(filter.tokens(), vec!["IT".to_string(), "US".to_string()]);
    }
}
