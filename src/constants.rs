/// Constants used to locate snapshot archives.
pub mod archive {
    /// Base URL under which all snapshot archives are published.
    pub const ARCHIVE_BASE_URL: &str = "https://storage.covid19datahub.io";
    /// Archive name of the continuously updated snapshot.
    pub const LATEST_ARCHIVE_NAME: &str = "latest";
    /// Member name of the upstream source-citation table bundled in every archive.
    pub const SOURCES_MEMBER: &str = "src";
    /// Prefix of raw (uncleaned) snapshot members.
    pub const RAW_MEMBER_PREFIX: &str = "raw";
    /// Stem shared by every snapshot member (`data-1`, `rawdata-2`, ...).
    pub const DATA_MEMBER_STEM: &str = "data";
    /// First day for which an archived vintage exists (year, month, day).
    pub const FIRST_VINTAGE: (i32, u32, u32) = (2020, 4, 14);
    /// Publication lag, in days, before a vintage becomes immutable.
    pub const VINTAGE_LAG_DAYS: i64 = 2;
    /// Extension used by the local directory transport.
    pub const JSONL_EXTENSION: &str = "jsonl";
}

/// Constants naming the columns the core logic relies on.
pub mod columns {
    /// Canonical location key.
    pub const ID: &str = "id";
    /// Observation date (`YYYY-MM-DD`).
    pub const DATE: &str = "date";
    /// ISO 3166-1 alpha-3 country code.
    pub const ISO_ALPHA_3: &str = "iso_alpha_3";
    /// ISO 3166-1 alpha-2 country code.
    pub const ISO_ALPHA_2: &str = "iso_alpha_2";
    /// ISO 3166-1 numeric country code.
    pub const ISO_NUMERIC: &str = "iso_numeric";
    /// Country name.
    pub const ADMIN_AREA_LEVEL_1: &str = "administrative_area_level_1";
    /// State or region name.
    pub const ADMIN_AREA_LEVEL_2: &str = "administrative_area_level_2";
    /// City or county name.
    pub const ADMIN_AREA_LEVEL_3: &str = "administrative_area_level_3";
    /// Granularity level recorded on each row and in the source table.
    pub const ADMIN_AREA_LEVEL: &str = "administrative_area_level";
    /// Google mobility place key.
    pub const KEY_GOOGLE_MOBILITY: &str = "key_google_mobility";
    /// Apple mobility place key.
    pub const KEY_APPLE_MOBILITY: &str = "key_apple_mobility";
    /// Source-table column naming the data column a citation covers.
    pub const DATA_TYPE: &str = "data_type";

    /// Columns a location token may match (besides `id`).
    pub const LOOKUP_COLUMNS: [&str; 4] = [ISO_ALPHA_3, ISO_ALPHA_2, ISO_NUMERIC, ADMIN_AREA_LEVEL_1];

    /// Columns describing the location rather than a measurement.
    ///
    /// These are kept as text, carried forward into grid-filled rows, and never
    /// zero-filled.
    pub const STATIC_COLUMNS: [&str; 19] = [
        ISO_ALPHA_3,
        ISO_ALPHA_2,
        ISO_NUMERIC,
        "iso_currency",
        ADMIN_AREA_LEVEL,
        ADMIN_AREA_LEVEL_1,
        ADMIN_AREA_LEVEL_2,
        ADMIN_AREA_LEVEL_3,
        "latitude",
        "longitude",
        "population",
        "key_local",
        KEY_GOOGLE_MOBILITY,
        KEY_APPLE_MOBILITY,
        "key_jhu_csse",
        "key_nuts",
        "key_gadm",
        "key",
        "key_alpha_2",
    ];

    /// Columns whose values are codes and must never be parsed as numbers.
    pub const TEXT_COLUMNS: [&str; 14] = [
        ISO_ALPHA_3,
        ISO_ALPHA_2,
        ISO_NUMERIC,
        "iso_currency",
        ADMIN_AREA_LEVEL_1,
        ADMIN_AREA_LEVEL_2,
        ADMIN_AREA_LEVEL_3,
        "key_local",
        KEY_GOOGLE_MOBILITY,
        KEY_APPLE_MOBILITY,
        "key_jhu_csse",
        "key_nuts",
        "key_gadm",
        "key_alpha_2",
    ];

    /// True when `column` describes the location rather than a measurement.
    pub fn is_static(column: &str) -> bool {
        STATIC_COLUMNS.contains(&column)
    }

    /// True when `column` must stay textual.
    pub fn is_text(column: &str) -> bool {
        TEXT_COLUMNS.contains(&column)
    }
}

/// Constants used by the World Bank merge stage.
pub mod indicators {
    /// Earliest day an indicator value may be taken from (year, month, day).
    pub const LOOKBACK_START: (i32, u32, u32) = (2010, 1, 1);
}

/// Constants used by request defaults.
pub mod request {
    /// Default first day of the returned window (year, month, day).
    pub const DEFAULT_START: (i32, u32, u32) = (2010, 1, 1);
}
