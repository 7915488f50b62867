// External crates
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use ndarray::{s, Array2, ArrayView2};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

// Local modules
use crate::constants::{NUM_FEATURES, PRICE_COLUMNS};
use crate::error::{PipelineError, Result};

/// Raw OHLC prices as loaded from disk, one row per trading day.
///
/// Columns are always stored in [`PRICE_COLUMNS`] order (close, open, high, low).
/// The table is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    values: Array2<f64>,
}

impl PriceTable {
    /// Wrap an existing `rows x 4` matrix
    pub fn new(values: Array2<f64>) -> Result<Self> {
        if values.ncols() != NUM_FEATURES {
            return Err(PipelineError::ColumnMismatch {
                expected: NUM_FEATURES,
                found: values.ncols(),
            });
        }
        Ok(Self { values })
    }

    /// Build a table from row literals
    pub fn from_rows(rows: &[[f64; NUM_FEATURES]]) -> Self {
        let values = Array2::from_shape_fn((rows.len(), NUM_FEATURES), |(r, c)| rows[r][c]);
        Self { values }
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// The last `n` rows, or the whole table when it is shorter
    pub fn tail(&self, n: usize) -> ArrayView2<'_, f64> {
        let start = self.n_rows().saturating_sub(n);
        self.values.slice(s![start.., ..])
    }
}

/// Map a CSV header onto one of the expected price columns.
///
/// Matching trims surrounding whitespace and ignores case, so exports with
/// headers like ` Close/Last` or `close` are accepted.
fn standard_column_index(header: &str) -> Option<usize> {
    match header.trim().to_lowercase().as_str() {
        "close/last" | "close" => Some(0),
        "open" => Some(1),
        "high" => Some(2),
        "low" => Some(3),
        _ => None,
    }
}

/// Parse a price cell such as `4512.3`, `$4,512.30` or ` $87.12 `
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.trim().parse::<f64>().ok()
}

const DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Parse a trading date such as `10/18/2024`, `2024-10-18` or
/// `2024-10-18 00:00:00`
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Row indices in chronological order, or `None` when there is no `Date` column.
///
/// The sort is stable, so rows sharing a date keep their file order.
fn chronological_order(df: &DataFrame) -> Result<Option<Vec<usize>>> {
    let name = match df
        .get_column_names()
        .into_iter()
        .find(|name| name.trim().eq_ignore_ascii_case("date"))
    {
        Some(name) => name.to_string(),
        None => return Ok(None),
    };

    let series = df
        .column(&name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let dates = series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.and_then(parse_date).ok_or_else(|| PipelineError::InvalidValue {
                column: name.trim().to_string(),
                row,
            })
        })
        .collect::<Result<Vec<NaiveDate>>>()?;

    let mut order: Vec<usize> = (0..dates.len()).collect();
    order.sort_by_key(|&row| dates[row]);
    Ok(Some(order))
}

/// Extract one column as f64, whatever dtype polars inferred for it
fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df.column(name)?.as_materialized_series();

    let invalid = |row: usize| PipelineError::InvalidValue {
        column: name.trim().to_string(),
        row,
    };

    match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| value.and_then(parse_price).ok_or_else(|| invalid(row)))
            .collect(),
        _ => {
            let cast = series.cast(&DataType::Float64)?;
            let values = cast
                .f64()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| value.ok_or_else(|| invalid(row)))
                .collect();
            values
        }
    }
}

/// Select the price columns of a DataFrame into a `PriceTable`.
///
/// When a `Date` column is present the rows are put in oldest-to-newest
/// order, so newest-first exports end with the latest trading day.
pub fn dataframe_to_price_table(df: &DataFrame) -> Result<PriceTable> {
    let mut resolved: [Option<String>; NUM_FEATURES] = Default::default();
    for name in df.get_column_names() {
        if let Some(idx) = standard_column_index(name.as_str()) {
            if resolved[idx].is_none() {
                resolved[idx] = Some(name.to_string());
            }
        }
    }

    let mut columns = Vec::with_capacity(NUM_FEATURES);
    for (idx, name) in resolved.iter().enumerate() {
        let name = name
            .as_ref()
            .ok_or_else(|| PipelineError::MissingColumn(PRICE_COLUMNS[idx].to_string()))?;
        debug!("Using CSV column {:?} as {}", name, PRICE_COLUMNS[idx]);
        columns.push(column_values(df, name)?);
    }

    let n_rows = df.height();
    let order = match chronological_order(df)? {
        Some(order) => {
            if order.windows(2).any(|pair| pair[0] > pair[1]) {
                info!("Reordered rows oldest to newest by date");
            }
            order
        }
        None => {
            debug!("No Date column, keeping file order");
            (0..n_rows).collect()
        }
    };
    let values = Array2::from_shape_fn((n_rows, NUM_FEATURES), |(r, c)| columns[c][order[r]]);
    PriceTable::new(values)
}

/// Load the price columns from a CSV file
///
/// # Arguments
///
/// * `file_path` - Path to a CSV file with a header row containing at least
///   `Close/Last`, `Open`, `High` and `Low`
///
/// # Returns
///
/// Returns the prices oldest first (file order when there is no `Date`
/// column), or an error if the file or a column is
/// missing or a value cannot be parsed
pub fn load_price_table<P: AsRef<Path>>(file_path: P) -> Result<PriceTable> {
    let path = file_path.as_ref();
    info!("Loading data from: {}", path.display());

    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let df = CsvReader::new(file).finish()?;
    debug!("CSV columns: {:?}", df.get_column_names());

    let table = dataframe_to_price_table(&df)?;
    info!("Loaded {} rows of price data", table.n_rows());
    Ok(table)
}
