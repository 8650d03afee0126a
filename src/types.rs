/// Canonical location identifier assigned by the upstream data provider.
/// Example: `ITA`, `USA, New York`, or an opaque hash like `0a1b2c3d`
pub type LocationId = String;
/// Name of a column in a panel table.
/// Examples: `confirmed`, `stringency_index`, `iso_alpha_3`
pub type ColumnName = String;
/// World Bank indicator code.
/// Examples: `NY.GDP.MKTP.CD`, `SH.MED.BEDS.ZS`
pub type IndicatorCode = String;
/// Friendly column name chosen by the caller for a World Bank indicator.
/// Examples: `gdp`, `hosp_beds`
pub type IndicatorAlias = String;
/// Location of an external series (URL or local path).
/// Example: `https://www.gstatic.com/covid19/mobility/Global_Mobility_Report.csv`
pub type SourceUrl = String;
/// User-supplied location token, matched case-insensitively.
/// Examples: `Italy`, `IT`, `ITA`, `380`
pub type LocationToken = String;
/// Key used by an external mobility provider to name a place.
/// Examples: `ChIJA9KNRIL-1BIRb15jJFz1LOI`, `country/region:Italy`
pub type MobilityKey = String;
/// Archive member name, without transport-specific extension.
/// Examples: `data-1`, `rawdata-3`, `src`
pub type MemberName = String;
