use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, error::ErrorKind};

use crate::assemble::PanelDataset;
use crate::config::{Level, PanelRequest};
use crate::metrics::panel_summary;
use crate::pipeline::PanelHub;
use crate::transport::{DirectoryArchive, JsonlIndicatorFeed, JsonlMobilityFeed};

/// Sub-directory of the archive root holding `<code>.jsonl` indicator series.
pub const INDICATOR_DIR: &str = "indicators";

#[derive(Debug, Parser)]
#[command(
    name = "panel_demo",
    disable_help_subcommand = true,
    about = "Assemble a COVID-19 panel from a local archive mirror",
    long_about = "Locate, filter, clean and merge a COVID-19 Data Hub snapshot served from a local directory, then print a coverage summary and its sources.",
    after_help = "Archives are read from <ARCHIVE_ROOT>/<latest|YYYY-MM-DD>/<member>.jsonl; World Bank series from <ARCHIVE_ROOT>/indicators/<CODE>.jsonl."
)]
/// CLI for `panel_demo`.
///
/// Common usage:
/// - All countries, cleaned: `--archive-root ./mirror`
/// - Italy and France by mixed codes: `--country ITA --country France`
/// - Attach GDP: `--wb gdp=NY.GDP.MKTP.CD`
/// - Read the archive frozen on a day: `--vintage --end 2020-06-30`
struct PanelDemoCli {
    #[arg(
        long = "archive-root",
        value_name = "PATH",
        default_value = "covid19_mirror",
        help = "Directory holding the archive mirror"
    )]
    archive_root: PathBuf,
    #[arg(
        long,
        value_name = "TOKEN",
        help = "Location name or code; repeat to select several"
    )]
    country: Vec<String>,
    #[arg(
        long,
        default_value = "1",
        value_parser = parse_level,
        help = "Administrative level: 1 country, 2 state, 3 city"
    )]
    level: Level,
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_day, help = "First day to return")]
    start: Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_day, help = "Last day to return (default: today)")]
    end: Option<NaiveDate>,
    #[arg(long, help = "Return data as collected, without gap filling")]
    raw: bool,
    #[arg(long, help = "Read the immutable archive dated --end")]
    vintage: bool,
    #[arg(long = "no-cache", help = "Bypass the result cache")]
    no_cache: bool,
    #[arg(long, help = "Do not log the panel's sources")]
    quiet: bool,
    #[arg(
        long,
        value_name = "NAME=CODE",
        value_parser = parse_indicator,
        help = "World Bank indicator to attach; repeat as needed"
    )]
    wb: Vec<(String, String)>,
    #[arg(long, value_name = "PATH", help = "Google mobility report (JSON Lines)")]
    gmr: Option<String>,
    #[arg(long, value_name = "PATH", help = "Apple mobility report (JSON Lines)")]
    amr: Option<String>,
    #[arg(long = "clean-locally", help = "Fetch raw data and gap-fill it in-process")]
    clean_locally: bool,
    #[arg(
        long = "show-rows",
        value_name = "N",
        default_value_t = 0,
        help = "Print the first N rows as JSON"
    )]
    show_rows: usize,
}

impl PanelDemoCli {
    fn request(&self) -> PanelRequest {
        let mut request = PanelRequest::default()
            .with_country(self.country.iter().cloned())
            .with_level(self.level)
            .with_raw(self.raw)
            .with_vintage(self.vintage)
            .with_cache(!self.no_cache)
            .with_verbose(!self.quiet)
            .with_clean_locally(self.clean_locally);
        if let Some(start) = self.start {
            request.start = start;
        }
        request.end = self.end;
        for (alias, code) in &self.wb {
            request = request.with_indicator(alias.clone(), code.clone());
        }
        if let Some(url) = &self.gmr {
            request = request.with_google_mobility(url.clone());
        }
        if let Some(url) = &self.amr {
            request = request.with_apple_mobility(url.clone());
        }
        request
    }
}

/// Hub reading everything from a local mirror rooted at `root`.
pub fn directory_hub(root: &Path) -> PanelHub {
    PanelHub::new(Arc::new(DirectoryArchive::new(root)))
        .with_indicators(Arc::new(JsonlIndicatorFeed::new(root.join(INDICATOR_DIR))))
        .with_google_mobility(Arc::new(JsonlMobilityFeed::new()))
        .with_apple_mobility(Arc::new(JsonlMobilityFeed::new()))
}

/// Run the panel demo with `args_iter` (program name excluded).
pub fn run_panel_demo<I, Build>(args_iter: I, build_hub: Build) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
    Build: FnOnce(&Path) -> PanelHub,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) =
        parse_cli::<PanelDemoCli, _>(std::iter::once("panel_demo".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let hub = build_hub(&cli.archive_root);
    let request = cli.request();
    match hub.fetch(&request)? {
        Some(dataset) => {
            print_summary(&dataset);
            print_sources(&dataset);
            print_rows(&dataset, cli.show_rows)?;
        }
        None => println!("No locations matched {:?}.", cli.country),
    }
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn parse_level(raw: &str) -> Result<Level, String> {
    let value = raw
        .trim()
        .parse::<u8>()
        .map_err(|_| format!("could not parse --level value '{raw}' as an integer"))?;
    Level::try_from(value).map_err(|err| err.to_string())
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{raw}': expected YYYY-MM-DD"))
}

fn parse_indicator(raw: &str) -> Result<(String, String), String> {
    let (alias, code) = raw
        .split_once('=')
        .ok_or_else(|| format!("--wb expects NAME=CODE (got '{raw}')"))?;
    let (alias, code) = (alias.trim(), code.trim());
    if alias.is_empty() || code.is_empty() {
        return Err(format!("--wb expects NAME=CODE (got '{raw}')"));
    }
    Ok((alias.to_string(), code.to_string()))
}

fn print_summary(dataset: &PanelDataset) {
    let summary = panel_summary(dataset);
    println!("=== panel ===");
    println!("snapshot : {} ({})", dataset.snapshot().archive, dataset.snapshot().member);
    println!("locations: {}", summary.locations);
    println!("rows     : {}", summary.rows);
    match summary.span {
        Some(span) => println!("span     : {} .. {}", span.start, span.end),
        None => println!("span     : (empty window)"),
    }
    println!();
    println!("[COLUMNS]");
    for column in &summary.per_column {
        println!(
            "  {:<40} missing {:>6} ({:.1}%)",
            column.column,
            column.missing,
            column.missing_share * 100.0
        );
    }
    println!();
}

fn print_sources(dataset: &PanelDataset) {
    println!("[SOURCES]");
    match dataset.provenance() {
        Some(provenance) => {
            for citation in &provenance.citations {
                println!("  {:?}: {} <{}>", citation.kind, citation.title, citation.reference);
            }
        }
        None => println!("  (unavailable)"),
    }
    println!();
}

fn print_rows(dataset: &PanelDataset, limit: usize) -> Result<(), Box<dyn Error>> {
    if limit == 0 {
        return Ok(());
    }
    println!("[ROWS]");
    for row in dataset.rows().iter().take(limit) {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}
