//! Campaign dataset loading using Polars

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::DataSourceError;

/// Header names every dataset must carry (order in the file is free)
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "channel",
    "region",
    "sector",
    "status",
    "impressions",
    "clicks",
    "conversions",
    "cost",
];

/// One row of the campaign dataset
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRecord {
    /// Marketing channel (paid search, social, email, ...)
    pub channel: Option<String>,
    pub region: Option<String>,
    pub sector: Option<String>,
    /// CRM lifecycle status
    pub status: Option<String>,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub cost: f64,
}

impl CampaignRecord {
    /// Value of a categorical column, `None` when the cell was empty
    pub fn dimension(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Channel => self.channel.as_deref(),
            Dimension::Region => self.region.as_deref(),
            Dimension::Sector => self.sector.as_deref(),
            Dimension::Status => self.status.as_deref(),
        }
    }
}

/// Categorical columns usable as grouping keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Dimension {
    Channel,
    Region,
    Sector,
    Status,
}

impl Dimension {
    pub fn column(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Region => "region",
            Self::Sector => "sector",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Anything that can hand out campaign records in dataset order
pub trait RecordSource {
    fn records(&self) -> impl Iterator<Item = &CampaignRecord>;
}

/// In-memory campaign table, row order matches the source file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    records: Vec<CampaignRecord>,
    skipped_rows: usize,
}

impl Table {
    pub fn new(records: Vec<CampaignRecord>) -> Self {
        Self {
            records,
            skipped_rows: 0,
        }
    }

    pub fn rows(&self) -> &[CampaignRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of source rows dropped because a numeric field was malformed
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

impl RecordSource for Table {
    fn records(&self) -> impl Iterator<Item = &CampaignRecord> {
        self.records.iter()
    }
}

impl FromIterator<CampaignRecord> for Table {
    fn from_iter<I: IntoIterator<Item = CampaignRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Load the campaign CSV and validate its schema
///
/// # Arguments
/// * `path` - Path to a comma-delimited CSV file with a header row
///
/// # Returns
/// * `Table` with one record per well-formed row, in file order
pub fn load(path: impl AsRef<Path>) -> Result<Table, DataSourceError> {
    let path = path.as_ref();
    let start = Instant::now();

    let metadata = std::fs::metadata(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => DataSourceError::NotFound {
            path: path.to_path_buf(),
        },
        _ => DataSourceError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;
    if !metadata.is_file() {
        return Err(DataSourceError::Unreadable {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }

    let parse_error = |source: PolarsError| DataSourceError::Parse {
        path: path.to_path_buf(),
        source,
    };

    // Every column is read as text; typing happens in the casts below so a
    // late odd cell never fails the whole scan
    let mut frame = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
        .map_err(parse_error)?;

    let schema = frame.collect_schema().map_err(parse_error)?;
    let missing: Vec<String> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|name| !schema.contains(name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(DataSourceError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }

    // Non-strict casts: unparseable cells (including fractional counts) become
    // nulls and are handled per row
    let df = frame
        .select([
            col("channel"),
            col("region"),
            col("sector"),
            col("status"),
            col("impressions").cast(DataType::Int64),
            col("clicks").cast(DataType::Int64),
            col("conversions").cast(DataType::Int64),
            col("cost").cast(DataType::Float64),
        ])
        .collect()
        .map_err(parse_error)?;

    let table = table_from_frame(&df).map_err(parse_error)?;

    info!(
        path = %path.display(),
        rows = table.len(),
        skipped = table.skipped_rows(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "dataset loaded"
    );

    Ok(table)
}

/// Reason a source row could not become a `CampaignRecord`
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
enum RowDefect {
    #[error("missing or non-numeric value in `{0}`")]
    Missing(&'static str),
    #[error("negative value in `{0}`")]
    Negative(&'static str),
    #[error("non-finite value in `{0}`")]
    NonFinite(&'static str),
}

fn count(value: Option<i64>, column: &'static str) -> Result<u64, RowDefect> {
    let value = value.ok_or(RowDefect::Missing(column))?;
    u64::try_from(value).map_err(|_| RowDefect::Negative(column))
}

fn amount(value: Option<f64>, column: &'static str) -> Result<f64, RowDefect> {
    let value = value.ok_or(RowDefect::Missing(column))?;
    if !value.is_finite() {
        return Err(RowDefect::NonFinite(column));
    }
    if value < 0.0 {
        return Err(RowDefect::Negative(column));
    }
    Ok(value)
}

fn numeric_fields(
    impressions: Option<i64>,
    clicks: Option<i64>,
    conversions: Option<i64>,
    cost: Option<f64>,
) -> Result<(u64, u64, u64, f64), RowDefect> {
    Ok((
        count(impressions, "impressions")?,
        count(clicks, "clicks")?,
        count(conversions, "conversions")?,
        amount(cost, "cost")?,
    ))
}

/// Convert the typed DataFrame into records, skipping malformed rows
fn table_from_frame(df: &DataFrame) -> PolarsResult<Table> {
    let channel = df.column("channel")?.str()?;
    let region = df.column("region")?.str()?;
    let sector = df.column("sector")?.str()?;
    let status = df.column("status")?.str()?;
    let impressions = df.column("impressions")?.i64()?;
    let clicks = df.column("clicks")?.i64()?;
    let conversions = df.column("conversions")?.i64()?;
    let cost = df.column("cost")?.f64()?;

    let mut records = Vec::with_capacity(df.height());
    let mut skipped_rows = 0;

    for idx in 0..df.height() {
        let numbers = numeric_fields(
            impressions.get(idx),
            clicks.get(idx),
            conversions.get(idx),
            cost.get(idx),
        );

        match numbers {
            Ok((impressions, clicks, conversions, cost)) => records.push(CampaignRecord {
                channel: channel.get(idx).map(str::to_string),
                region: region.get(idx).map(str::to_string),
                sector: sector.get(idx).map(str::to_string),
                status: status.get(idx).map(str::to_string),
                impressions,
                clicks,
                conversions,
                cost,
            }),
            Err(defect) => {
                // +2: header line plus 1-based numbering
                warn!(line = idx + 2, reason = %defect, "skipping malformed row");
                skipped_rows += 1;
            }
        }
    }

    Ok(Table {
        records,
        skipped_rows,
    })
}

/// Memoized dataset accessor: loads once, serves the same table until invalidated
#[derive(Debug)]
pub struct DatasetCache {
    path: PathBuf,
    table: Option<Table>,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: None,
        }
    }

    /// Return the cached table, loading it on first access
    pub fn get(&mut self) -> Result<&Table, DataSourceError> {
        let table = match self.table.take() {
            Some(table) => {
                debug!(path = %self.path.display(), "dataset cache hit");
                table
            }
            None => load(&self.path)?,
        };
        Ok(&*self.table.insert(table))
    }

    /// Drop the cached table so the next `get` reads the file again.
    /// Returns whether a table was cached.
    pub fn invalidate(&mut self) -> bool {
        let was_loaded = self.table.take().is_some();
        if was_loaded {
            debug!(path = %self.path.display(), "dataset cache invalidated");
        }
        was_loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    fn create_test_csv() -> NamedTempFile {
        write_csv(&[
            "channel,region,sector,status,impressions,clicks,conversions,cost",
            "social,EU,retail,won,100,10,2,5.0",
            "search,US,finance,lost,2000,80,8,120.5",
            "email,EU,retail,lead,500,0,0,0.0",
        ])
    }

    #[test]
    fn test_load_preserves_row_order() {
        let file = create_test_csv();
        let table = load(file.path()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.skipped_rows(), 0);
        let channels: Vec<_> = table
            .rows()
            .iter()
            .map(|r| r.channel.as_deref().unwrap())
            .collect();
        assert_eq!(channels, vec!["social", "search", "email"]);

        let search = &table.rows()[1];
        assert_eq!(search.impressions, 2000);
        assert_eq!(search.clicks, 80);
        assert_eq!(search.conversions, 8);
        assert!((search.cost - 120.5).abs() < 1e-12);
    }

    #[test]
    fn test_load_accepts_any_column_order() {
        let file = write_csv(&[
            "cost,conversions,clicks,impressions,status,sector,region,channel,notes",
            "5.0,2,10,100,won,retail,EU,social,first batch",
        ]);
        let table = load(file.path()).unwrap();

        assert_eq!(table.len(), 1);
        let record = &table.rows()[0];
        assert_eq!(record.channel.as_deref(), Some("social"));
        assert_eq!(record.status.as_deref(), Some("won"));
        assert_eq!(record.impressions, 100);
        assert_eq!(record.conversions, 2);
    }

    #[test]
    fn test_load_reports_every_missing_column() {
        let file = write_csv(&["channel,region,impressions,clicks,cost", "social,EU,100,10,5.0"]);

        match load(file.path()) {
            Err(DataSourceError::MissingColumns { columns, .. }) => {
                assert_eq!(columns, vec!["sector", "status", "conversions"]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");

        let err = load(&path).unwrap_err();
        assert!(matches!(err, DataSourceError::NotFound { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn test_load_directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, DataSourceError::Unreadable { .. }));
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let file = write_csv(&[
            "channel,region,sector,status,impressions,clicks,conversions,cost",
            "social,EU,retail,won,100,10,2,5.0",
            "social,EU,retail,won,,10,2,5.0",
            "search,US,retail,won,100,-3,2,5.0",
            "email,US,retail,won,100,10,2,abc",
            "email,US,retail,won,40,4,1,2.0",
        ]);
        let table = load(file.path()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.skipped_rows(), 3);
        assert_eq!(table.rows()[1].impressions, 40);
    }

    #[test]
    fn test_fractional_count_is_skipped() {
        let file = write_csv(&[
            "channel,region,sector,status,impressions,clicks,conversions,cost",
            "social,EU,retail,won,100.9,10,2,5.0",
            "social,EU,retail,won,100,10,2,5",
        ]);
        let table = load(file.path()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped_rows(), 1);
        assert_eq!(table.rows()[0].impressions, 100);
        assert_eq!(table.rows()[0].cost, 5.0);
    }

    #[test]
    fn test_empty_categorical_becomes_absent_key() {
        let file = write_csv(&[
            "channel,region,sector,status,impressions,clicks,conversions,cost",
            ",EU,retail,won,100,10,2,5.0",
        ]);
        let table = load(file.path()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].dimension(Dimension::Channel), None);
        assert_eq!(table.rows()[0].dimension(Dimension::Region), Some("EU"));
    }

    #[test]
    fn test_header_only_dataset_is_empty() {
        let file = write_csv(&["channel,region,sector,status,impressions,clicks,conversions,cost"]);
        let table = load(file.path()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_cache_loads_once_until_invalidated() {
        let mut file = create_test_csv();
        let mut cache = DatasetCache::new(file.path());
        assert!(!cache.invalidate());

        assert_eq!(cache.get().unwrap().len(), 3);

        // Appended rows are not visible while the cached table is served
        writeln!(file, "social,US,retail,won,10,1,0,1.0").unwrap();
        file.flush().unwrap();
        assert_eq!(cache.get().unwrap().len(), 3);

        assert!(cache.invalidate());
        assert!(!cache.invalidate());
        assert_eq!(cache.get().unwrap().len(), 4);
    }

    #[test]
    fn test_cache_propagates_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = DatasetCache::new(dir.path().join("missing.csv"));
        let err = cache.get().unwrap_err();
        assert!(matches!(err, DataSourceError::NotFound { .. }));
        assert!(!cache.invalidate());
    }
}
