use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::DateWindow;
use crate::constants::columns;
use crate::errors::PanelError;
use crate::types::{ColumnName, LocationId};

/// One cell of a panel table.
///
/// The measurement schema is owned by the data provider, so cells are either
/// numbers, free text, or missing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Finite numeric value.
    Number(f64),
    /// Categorical or code value.
    Text(String),
    /// No value reported.
    Missing,
}

impl CellValue {
    /// Parse a raw transport cell for `column`.
    ///
    /// Empty cells are missing; code columns stay text; everything else is a
    /// number when it parses to a finite `f64`.
    pub fn parse(column: &str, raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return CellValue::Missing;
        };
        if columns::is_text(column) {
            return CellValue::Text(raw.to_string());
        }
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => CellValue::Number(value),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    /// Returns `true` when no value is present.
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Numeric value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Text value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<Option<f64>> for CellValue {
    fn from(value: Option<f64>) -> Self {
        value.map(CellValue::Number).unwrap_or(CellValue::Missing)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// One `(location, date)` observation with an open set of columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Canonical location key.
    pub id: LocationId,
    /// Observation day.
    pub date: NaiveDate,
    /// Every other column, keyed by name.
    #[serde(flatten)]
    pub values: IndexMap<ColumnName, CellValue>,
}

impl Observation {
    /// Create an observation with no columns besides `id` and `date`.
    pub fn new(id: impl Into<LocationId>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            date,
            values: IndexMap::new(),
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, column: impl Into<ColumnName>, value: impl Into<CellValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Cell of `column`; absent columns read as `None`.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }

    /// Set `column` to `value`, returning the previous value.
    pub fn set(&mut self, column: impl Into<ColumnName>, value: CellValue) -> Option<CellValue> {
        self.values.insert(column.into(), value)
    }

    /// Textual view of `column`, including the canonical `id`.
    ///
    /// Numeric cells are rendered so code columns read from numeric sources
    /// still match.
    pub fn text(&self, column: &str) -> Option<String> {
        if column == columns::ID {
            return Some(self.id.clone());
        }
        match self.values.get(column)? {
            CellValue::Text(value) => Some(value.clone()),
            CellValue::Number(value) => Some(value.to_string()),
            CellValue::Missing => None,
        }
    }
}

/// Untyped table as delivered by an archive transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Header row.
    pub columns: Vec<String>,
    /// Data rows aligned with `columns`; `None` marks an empty cell.
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Create an empty table with the given header.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; short rows are padded with empty cells.
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let mut row: Vec<Option<String>> = cells
            .into_iter()
            .map(|cell| cell.map(Into::into))
            .collect();
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    /// Position of `column` in the header.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// Cell at (`row`, `column`), if present and non-empty.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Panel of observations sharing one column list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelTable {
    columns: Vec<ColumnName>,
    rows: Vec<Observation>,
}

impl PanelTable {
    /// Create an empty table with known value columns.
    pub fn new(columns: Vec<ColumnName>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from rows, collecting columns in first-seen order.
    pub fn from_rows(rows: Vec<Observation>) -> Self {
        let mut table = Self::default();
        for row in rows {
            table.push(row);
        }
        table
    }

    /// Convert a transport table into typed observations.
    ///
    /// `resource` names the member in error messages.
    pub fn from_raw(raw: &RawTable, resource: &str) -> Result<Self, PanelError> {
        let id_idx = raw.column_index(columns::ID).ok_or_else(|| {
            PanelError::fetch(resource, format!("missing '{}' column", columns::ID))
        })?;
        let date_idx = raw.column_index(columns::DATE).ok_or_else(|| {
            PanelError::fetch(resource, format!("missing '{}' column", columns::DATE))
        })?;
        let value_columns: Vec<(usize, &String)> = raw
            .columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != id_idx && *idx != date_idx)
            .collect();

        let mut table = Self::new(value_columns.iter().map(|(_, name)| (*name).clone()).collect());
        table.rows.reserve(raw.rows.len());
        for (row_idx, row) in raw.rows.iter().enumerate() {
            let id = row
                .get(id_idx)
                .and_then(|cell| cell.as_deref())
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| PanelError::fetch(resource, format!("row {row_idx} has no id")))?;
            let date_text = row
                .get(date_idx)
                .and_then(|cell| cell.as_deref())
                .ok_or_else(|| {
                    PanelError::fetch(resource, format!("row {row_idx} has no date"))
                })?;
            let date = NaiveDate::parse_from_str(date_text.trim(), "%Y-%m-%d").map_err(|err| {
                PanelError::fetch(
                    resource,
                    format!("row {row_idx} has invalid date '{date_text}': {err}"),
                )
            })?;
            let mut observation = Observation::new(id, date);
            for (col_idx, name) in &value_columns {
                let cell = row.get(*col_idx).and_then(|cell| cell.as_deref());
                observation
                    .values
                    .insert((*name).clone(), CellValue::parse(name, cell));
            }
            table.rows.push(observation);
        }
        Ok(table)
    }

    /// Value columns (everything except `id` and `date`), in order.
    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    /// Returns `true` when `column` is a known value column.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }

    /// Register `column`; returns `true` when it already existed.
    pub fn ensure_column(&mut self, column: &str) -> bool {
        if self.has_column(column) {
            return true;
        }
        self.columns.push(column.to_string());
        false
    }

    /// Append a row, registering any new columns.
    pub fn push(&mut self, row: Observation) {
        for column in row.values.keys() {
            self.ensure_column(column);
        }
        self.rows.push(row);
    }

    /// Observations in table order.
    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    /// Mutable access to observations; columns must be registered separately.
    pub fn rows_mut(&mut self) -> &mut [Observation] {
        &mut self.rows
    }

    /// Consume the table, returning its rows.
    pub fn into_rows(self) -> Vec<Observation> {
        self.rows
    }

    /// Replace the rows while keeping the column list.
    pub fn with_rows(self, rows: Vec<Observation>) -> Self {
        Self {
            columns: self.columns,
            rows,
        }
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when the table has no observations.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep only rows for which `keep` returns `true`.
    pub fn retain(&mut self, keep: impl FnMut(&Observation) -> bool) {
        self.rows.retain(keep);
    }

    /// Stable sort by `(id, date)`.
    pub fn sort_by_location_date(&mut self) {
        self.rows
            .sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.date.cmp(&b.date)));
    }

    /// Drop rows repeating an earlier `(id, date)` pair; returns how many.
    ///
    /// Expects rows sorted by `(id, date)`.
    pub fn dedup_location_dates(&mut self) -> usize {
        let before = self.rows.len();
        self.rows
            .dedup_by(|later, earlier| later.id == earlier.id && later.date == earlier.date);
        before - self.rows.len()
    }

    /// Distinct location ids in first-seen order.
    pub fn location_ids(&self) -> Vec<&str> {
        let mut seen = indexmap::IndexSet::new();
        for row in &self.rows {
            seen.insert(row.id.as_str());
        }
        seen.into_iter().collect()
    }

    /// Earliest and latest observation day, if any rows exist.
    pub fn date_span(&self) -> Option<DateWindow> {
        let start = self.rows.iter().map(|row| row.date).min()?;
        let end = self.rows.iter().map(|row| row.date).max()?;
        Some(DateWindow { start, end })
    }

    /// Copy of the table restricted to `window`.
    pub fn restricted_to(&self, window: &DateWindow) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| window.contains(row.date))
                .cloned()
                .collect(),
        }
    }
}
