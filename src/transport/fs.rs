use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use indexmap::IndexSet;
use serde_json::{Map, Value};

use super::{
    ArchiveFetcher, IndicatorFetcher, IndicatorPoint, MobilityFetcher, MobilityPoint,
    MobilitySeries,
};
use crate::config::{DateWindow, Level};
use crate::constants::archive::JSONL_EXTENSION;
use crate::constants::columns;
use crate::data::RawTable;
use crate::errors::PanelError;
use crate::snapshot::ArchiveRef;

/// Archive transport reading `<root>/<archive-name>/<member>.jsonl`.
///
/// Each line is one JSON object; the header is the union of keys in
/// first-seen order.
pub struct DirectoryArchive {
    root: PathBuf,
}

impl DirectoryArchive {
    /// Create a transport rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of `member` inside `archive`.
    pub fn member_path(&self, archive: &ArchiveRef, member: &str) -> PathBuf {
        self.root
            .join(archive.name())
            .join(format!("{member}.{JSONL_EXTENSION}"))
    }

    /// Write `table` as `member` of `archive`, creating directories as needed.
    pub fn publish(
        &self,
        archive: &ArchiveRef,
        member: &str,
        table: &RawTable,
    ) -> Result<(), PanelError> {
        let path = self.member_path(archive, member);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_jsonl_table(&path, table)
    }
}

impl ArchiveFetcher for DirectoryArchive {
    fn fetch_member(&self, archive: &ArchiveRef, member: &str) -> Result<RawTable, PanelError> {
        let dir = self.root.join(archive.name());
        if !dir.is_dir() {
            return Err(PanelError::fetch(
                dir.display().to_string(),
                "archive directory does not exist",
            ));
        }
        let path = self.member_path(archive, member);
        if !path.is_file() {
            return Err(PanelError::NotFound {
                archive: archive.name(),
                member: member.to_string(),
            });
        }
        read_jsonl_table(&path)
    }
}

/// Indicator transport reading `<dir>/<code>.jsonl`.
///
/// Rows carry `iso_alpha_3`, `value`, and either `date` (`YYYY-MM-DD`) or an
/// annual `year`.
pub struct JsonlIndicatorFeed {
    dir: PathBuf,
}

impl JsonlIndicatorFeed {
    /// Create a feed reading indicator files from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl IndicatorFetcher for JsonlIndicatorFeed {
    fn fetch_indicator(
        &self,
        code: &str,
        window: &DateWindow,
    ) -> Result<Vec<IndicatorPoint>, PanelError> {
        let path = self.dir.join(format!("{code}.{JSONL_EXTENSION}"));
        let resource = path.display().to_string();
        let mut points = Vec::new();
        for (line_no, object) in read_jsonl_objects(&path)?.into_iter().enumerate() {
            let iso_alpha_3 = object
                .get(columns::ISO_ALPHA_3)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    PanelError::fetch(&resource, format!("line {} has no iso_alpha_3", line_no + 1))
                })?;
            let date = match (object.get(columns::DATE), object.get("year")) {
                (Some(Value::String(text)), _) => parse_day(text, &resource, line_no)?,
                (_, Some(year)) => year
                    .as_i64()
                    .and_then(|year| i32::try_from(year).ok())
                    .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
                    .ok_or_else(|| {
                        PanelError::fetch(&resource, format!("line {} has invalid year", line_no + 1))
                    })?,
                _ => {
                    return Err(PanelError::fetch(
                        &resource,
                        format!("line {} has neither date nor year", line_no + 1),
                    ));
                }
            };
            if !window.contains(date) {
                continue;
            }
            points.push(IndicatorPoint {
                iso_alpha_3: iso_alpha_3.to_string(),
                date,
                value: object.get("value").and_then(Value::as_f64),
            });
        }
        Ok(points)
    }
}

/// Mobility transport treating the report URL as a local JSON Lines path.
///
/// Rows carry `key`, `date`, an optional `level`, and one numeric field per
/// category. Rows whose `level` differs from the requested level are skipped.
#[derive(Default)]
pub struct JsonlMobilityFeed;

impl JsonlMobilityFeed {
    /// Create a feed.
    pub fn new() -> Self {
        Self
    }
}

impl MobilityFetcher for JsonlMobilityFeed {
    fn fetch_mobility(&self, url: &str, level: Level) -> Result<MobilitySeries, PanelError> {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        let objects = read_jsonl_objects(path)?;

        let mut categories: Vec<String> = Vec::new();
        for object in &objects {
            for key in object.keys() {
                if matches!(key.as_str(), "key" | "date" | "level") {
                    continue;
                }
                if !categories.iter().any(|existing| existing == key) {
                    categories.push(key.clone());
                }
            }
        }

        let mut points = Vec::with_capacity(objects.len());
        for (line_no, object) in objects.iter().enumerate() {
            let row_level = object.get("level").and_then(Value::as_u64);
            if row_level.is_some_and(|row_level| row_level != u64::from(level.as_u8())) {
                continue;
            }
            let key = object.get("key").and_then(Value::as_str).ok_or_else(|| {
                PanelError::fetch(url, format!("line {} has no key", line_no + 1))
            })?;
            let date_text = object.get("date").and_then(Value::as_str).ok_or_else(|| {
                PanelError::fetch(url, format!("line {} has no date", line_no + 1))
            })?;
            let date = parse_day(date_text, url, line_no)?;
            let values = categories
                .iter()
                .map(|category| object.get(category).and_then(Value::as_f64))
                .collect();
            points.push(MobilityPoint {
                key: key.to_string(),
                date,
                values,
            });
        }
        Ok(MobilitySeries { categories, points })
    }
}

/// Read a JSON Lines file into an untyped table.
pub fn read_jsonl_table(path: &Path) -> Result<RawTable, PanelError> {
    let objects = read_jsonl_objects(path)?;
    let mut header: IndexSet<String> = IndexSet::new();
    for object in &objects {
        for key in object.keys() {
            header.insert(key.clone());
        }
    }
    let mut table = RawTable::new(header.iter().cloned());
    for object in &objects {
        table.push_row(header.iter().map(|key| object.get(key).and_then(cell_text)));
    }
    Ok(table)
}

/// Write an untyped table as JSON Lines; empty cells become `null`.
pub fn write_jsonl_table(path: &Path, table: &RawTable) -> Result<(), PanelError> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for row in &table.rows {
        let mut object = Map::new();
        for (column, cell) in table.columns.iter().zip(row) {
            let value = cell
                .as_ref()
                .map(|text| Value::String(text.clone()))
                .unwrap_or(Value::Null);
            object.insert(column.clone(), value);
        }
        serde_json::to_writer(&mut writer, &Value::Object(object))
            .map_err(|err| PanelError::fetch(path.display().to_string(), err.to_string()))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn read_jsonl_objects(path: &Path) -> Result<Vec<Map<String, Value>>, PanelError> {
    let resource = path.display().to_string();
    let file = fs::File::open(path)
        .map_err(|err| PanelError::fetch(&resource, format!("failed opening: {err}")))?;
    let mut objects = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let object: Map<String, Value> = serde_json::from_str(&line).map_err(|err| {
            PanelError::fetch(&resource, format!("line {} is not a JSON object: {err}", line_no + 1))
        })?;
        objects.push(object);
    }
    Ok(objects)
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_day(text: &str, resource: &str, line_no: usize) -> Result<NaiveDate, PanelError> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|err| {
        PanelError::fetch(
            resource,
            format!("line {} has invalid date '{text}': {err}", line_no + 1),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn directory_archive_round_trips_published_members() {
        let temp = tempdir().unwrap();
        let archive = DirectoryArchive::new(temp.path());
        let mut table = RawTable::new(["id", "date", "confirmed"]);
        table.push_row([Some("ITA"), Some("2020-03-01"), None]);
        archive.publish(&ArchiveRef::Latest, "data-1", &table).unwrap();

        let fetched = archive.fetch_member(&ArchiveRef::Latest, "data-1").unwrap();
        assert_eq!(fetched, table);
        assert!(matches!(
            archive.fetch_member(&ArchiveRef::Latest, "rawdata-1"),
            Err(PanelError::NotFound { .. })
        ));
    }

    #[test]
    fn missing_archive_directory_is_a_fetch_error() {
        let temp = tempdir().unwrap();
        let archive = DirectoryArchive::new(temp.path());
        let dated = ArchiveRef::Dated(NaiveDate::from_ymd_opt(2020, 5, 1).unwrap());
        assert!(matches!(
            archive.fetch_member(&dated, "data-1"),
            Err(PanelError::Fetch { .. })
        ));
    }

    #[test]
    fn jsonl_numbers_become_text_cells() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("t.jsonl");
        fs::write(
            &path,
            "{\"id\":\"ITA\",\"date\":\"2020-03-01\",\"confirmed\":7}\n\n{\"id\":\"FRA\",\"date\":\"2020-03-01\",\"deaths\":null}\n",
        )
        .unwrap();
        let table = read_jsonl_table(&path).unwrap();
        assert_eq!(table.columns, vec!["id", "date", "confirmed", "deaths"]);
        assert_eq!(table.cell(0, "confirmed"), Some("7"));
        assert_eq!(table.cell(1, "confirmed"), None);
        assert_eq!(table.cell(1, "deaths"), None);
    }

    #[test]
    fn indicator_feed_accepts_years_and_clips_to_window() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("SP.POP.TOTL.jsonl"),
            "{\"iso_alpha_3\":\"ITA\",\"year\":2018,\"value\":60.4}\n{\"iso_alpha_3\":\"ITA\",\"date\":\"2019-01-01\",\"value\":null}\n{\"iso_alpha_3\":\"ITA\",\"year\":2030,\"value\":1}\n",
        )
        .unwrap();
        let feed = JsonlIndicatorFeed::new(temp.path());
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        )
        .unwrap();
        let points = feed.fetch_indicator("SP.POP.TOTL", &window).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, Some(60.4));
        assert_eq!(points[1].value, None);
    }

    #[test]
    fn mobility_feed_filters_level_and_collects_categories() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("gmr.jsonl");
        fs::write(
            &path,
            "{\"key\":\"IT\",\"date\":\"2020-03-01\",\"level\":1,\"parks\":-3.0}\n{\"key\":\"IT-LOM\",\"date\":\"2020-03-01\",\"level\":2,\"parks\":-9.0,\"transit\":-20}\n",
        )
        .unwrap();
        let url = format!("file://{}", path.display());
        let series = JsonlMobilityFeed::new().fetch_mobility(&url, Level::Country).unwrap();
        assert_eq!(series.categories, vec!["parks", "transit"]);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].values, vec![Some(-3.0), None]);
    }
}
