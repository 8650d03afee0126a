//! Snapshot locator.
//!
//! Maps `(level, cleaning mode, vintage)` to the archive and member that hold
//! the requested snapshot. All checks here are pure so bad input fails before
//! any transport is touched.

use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CleaningMode, Level, Vintage};
use crate::constants::archive::{
    ARCHIVE_BASE_URL, DATA_MEMBER_STEM, FIRST_VINTAGE, LATEST_ARCHIVE_NAME, RAW_MEMBER_PREFIX,
    SOURCES_MEMBER, VINTAGE_LAG_DAYS,
};
use crate::errors::PanelError;
use crate::types::MemberName;

/// Archive holding one or more snapshot members.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveRef {
    /// Continuously updated archive.
    Latest,
    /// Immutable archive published for the given day.
    Dated(NaiveDate),
}

impl ArchiveRef {
    /// Archive name (`latest` or `YYYY-MM-DD`).
    pub fn name(&self) -> String {
        match self {
            ArchiveRef::Latest => LATEST_ARCHIVE_NAME.to_string(),
            ArchiveRef::Dated(date) => date.format("%Y-%m-%d").to_string(),
        }
    }

    /// Public download URL of the archive.
    pub fn url(&self) -> String {
        format!("{ARCHIVE_BASE_URL}/{}.zip", self.name())
    }

    /// Every member a published archive carries: the six level/mode
    /// combinations plus the source-citation table.
    pub fn bundled_members() -> Vec<MemberName> {
        let mut members = Vec::with_capacity(7);
        for mode in [CleaningMode::Cleaned, CleaningMode::Raw] {
            for level in [Level::Country, Level::State, Level::City] {
                members.push(member_name(level, mode));
            }
        }
        members.push(SOURCES_MEMBER.to_string());
        members
    }
}

impl fmt::Display for ArchiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Identity of exactly one snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId {
    /// Administrative granularity.
    pub level: Level,
    /// Raw or cleaned variant.
    pub mode: CleaningMode,
    /// Latest or archived vintage.
    pub vintage: Vintage,
}

/// Where a resolved snapshot lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLocation {
    /// Snapshot identity that was resolved.
    pub id: SnapshotId,
    /// Archive to read from.
    pub archive: ArchiveRef,
    /// Member holding the snapshot table (`{raw?}data-{level}`).
    pub member: MemberName,
    /// Member holding the upstream source-citation table.
    pub sources_member: MemberName,
}

/// Member name for a level/mode combination: `{raw?}data-{level}`.
pub fn member_name(level: Level, mode: CleaningMode) -> MemberName {
    let prefix = match mode {
        CleaningMode::Raw => RAW_MEMBER_PREFIX,
        CleaningMode::Cleaned => "",
    };
    format!("{prefix}{DATA_MEMBER_STEM}-{}", level.as_u8())
}

/// Inclusive range of vintages that may be requested on `today`.
pub fn vintage_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (year, month, day) = FIRST_VINTAGE;
    let first = NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN);
    let last = today - Duration::days(VINTAGE_LAG_DAYS);
    (first, last)
}

/// Check that an archived vintage for `requested` may exist on `today`.
pub fn validate_vintage(requested: NaiveDate, today: NaiveDate) -> Result<(), PanelError> {
    let (first, last) = vintage_bounds(today);
    if requested < first {
        return Err(PanelError::DateOutOfRange {
            requested,
            bound: first,
        });
    }
    if requested > last {
        return Err(PanelError::DateOutOfRange {
            requested,
            bound: last,
        });
    }
    Ok(())
}

/// Resolve a snapshot identity to its archive location.
pub fn resolve(
    level: Level,
    mode: CleaningMode,
    vintage: Vintage,
    today: NaiveDate,
) -> Result<SnapshotLocation, PanelError> {
    let archive = match vintage {
        Vintage::Latest => ArchiveRef::Latest,
        Vintage::ArchivedOn(date) => {
            validate_vintage(date, today)?;
            ArchiveRef::Dated(date)
        }
    };
    let location = SnapshotLocation {
        id: SnapshotId {
            level,
            mode,
            vintage,
        },
        archive,
        member: member_name(level, mode),
        sources_member: SOURCES_MEMBER.to_string(),
    };
    debug!(
        archive = %location.archive,
        member = %location.member,
        "snapshot resolved"
    );
    Ok(location)
}
