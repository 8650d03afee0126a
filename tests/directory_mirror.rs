use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tempfile::tempdir;

use covid19_hub::example_apps::{INDICATOR_DIR, directory_hub, run_panel_demo};
use covid19_hub::{ArchiveRef, CellValue, DirectoryArchive, PanelError, PanelRequest, RawTable};

fn day(month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, month, d).unwrap()
}

fn publish_mirror(root: &Path) {
    let archive = DirectoryArchive::new(root);
    let mut data = RawTable::new(["id", "date", "iso_alpha_3", "key_google_mobility", "confirmed"]);
    data.push_row([Some("ITA"), Some("2020-03-01"), Some("ITA"), Some("IT"), Some("1")]);
    data.push_row([Some("ITA"), Some("2020-03-02"), Some("ITA"), Some("IT"), Some("4")]);
    data.push_row([Some("DEU"), Some("2020-03-01"), Some("DEU"), Some("DE"), Some("2")]);
    archive.publish(&ArchiveRef::Latest, "data-1", &data).unwrap();

    let mut sources = RawTable::new(["iso_alpha_3", "data_type", "title", "url"]);
    sources.push_row([Some("ITA"), Some("confirmed"), Some("Protezione Civile"), Some("https://pc.it")]);
    archive.publish(&ArchiveRef::Latest, "src", &sources).unwrap();

    let indicators = root.join(INDICATOR_DIR);
    fs::create_dir_all(&indicators).unwrap();
    fs::write(
        indicators.join("SP.POP.TOTL.jsonl"),
        concat!(
            "{\"iso_alpha_3\":\"ITA\",\"year\":2018,\"value\":60.4}\n",
            "{\"iso_alpha_3\":\"ITA\",\"year\":2019,\"value\":null}\n",
            "{\"iso_alpha_3\":\"DEU\",\"year\":2019,\"value\":83.1}\n",
        ),
    )
    .unwrap();

    fs::write(
        root.join("gmr.jsonl"),
        concat!(
            "{\"key\":\"IT\",\"date\":\"2020-03-02\",\"level\":1,\"retail\":-20.0}\n",
            "{\"key\":\"IT\",\"date\":\"2020-03-02\",\"level\":2,\"retail\":-99.0}\n",
        ),
    )
    .unwrap();
}

#[test]
fn hub_assembles_panel_from_local_mirror() {
    let dir = tempdir().unwrap();
    publish_mirror(dir.path());
    let gmr = dir.path().join("gmr.jsonl").display().to_string();

    let hub = directory_hub(dir.path()).with_clock(|| day(6, 30));
    let request = PanelRequest::default()
        .with_country(["Italy", "ita"])
        .with_window(day(3, 1), day(3, 31))
        .with_indicator("population", "SP.POP.TOTL")
        .with_google_mobility(format!("file://{gmr}"));
    let dataset = hub.fetch(&request).unwrap().expect("rows for ITA");

    assert_eq!(dataset.len(), 2);
    let rows = dataset.rows();
    assert!(rows.iter().all(|row| row.id == "ITA"));
    assert!(
        rows.iter()
            .all(|row| row.get("population") == Some(&CellValue::Number(60.4)))
    );
    assert_eq!(rows[0].get("retail"), Some(&CellValue::Missing));
    assert_eq!(rows[1].get("retail"), Some(&CellValue::Number(-20.0)));
    assert_eq!(
        dataset.provenance().map(|provenance| provenance.citations.len()),
        Some(4)
    );
}

#[test]
fn missing_member_surfaces_as_not_found() {
    let dir = tempdir().unwrap();
    publish_mirror(dir.path());
    let hub = directory_hub(dir.path()).with_clock(|| day(6, 30));
    let request = PanelRequest::default().with_raw(true);
    assert!(matches!(
        hub.fetch(&request),
        Err(PanelError::NotFound { ref member, .. }) if member == "rawdata-1"
    ));
}

#[test]
fn demo_runner_accepts_cli_arguments() {
    let dir = tempdir().unwrap();
    publish_mirror(dir.path());
    let args = [
        "--archive-root",
        dir.path().to_str().unwrap(),
        "--country",
        "DEU",
        "--end",
        "2020-03-31",
        "--wb",
        "population=SP.POP.TOTL",
        "--show-rows",
        "1",
        "--quiet",
    ]
    .map(String::from);
    run_panel_demo(args.into_iter(), directory_hub).unwrap();

    assert!(run_panel_demo(["--level".to_string(), "9".to_string()].into_iter(), directory_hub).is_err());
}
