//! Spreadsheet import/export of a score grid.
//!
//! Layout: one `时间点` column holding the time point label, then two
//! columns per question (`"{question} - 得分"` and `"{question} - 说明"`),
//! one row per time point. The same layout is used for `.xlsx` and `.csv`.

mod delimited;
mod frame;
mod workbook;

pub use frame::{frame_from_grid, grid_from_frame};

use crate::grid::DataGrid;
use polars::prelude::PolarsError;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub const TIME_POINT_COLUMN: &str = "时间点";
pub const FIELD_SEPARATOR: &str = " - ";
pub const SCORE_FIELD: &str = "得分";
pub const NOTE_FIELD: &str = "说明";
pub const SHEET_NAME: &str = "数据";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("missing or malformed \"时间点\" column: {reason}")]
    MissingTimeColumn { reason: String },
    #[error("malformed score '{value}' in column \"{column}\", row {row}")]
    MalformedScore {
        column: String,
        row: usize,
        value: String,
    },
    #[error("workbook contains no worksheet")]
    EmptyWorkbook,
    #[error("unsupported table format '{0}' (expected xlsx or csv)")]
    UnsupportedFormat(String),
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("xlsx read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type TableResult<T> = Result<T, TableError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFormat {
    #[default]
    Xlsx,
    Csv,
}

impl TableFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Xlsx => "xlsx",
            TableFormat::Csv => "csv",
        }
    }

    pub fn from_path(path: &Path) -> TableResult<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        ext.parse()
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TableFormat {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(TableFormat::Xlsx),
            "csv" => Ok(TableFormat::Csv),
            other => Err(TableError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Result of decoding a table: the grid plus the questions in the order
/// their columns first appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedTable {
    pub grid: DataGrid,
    pub items: Vec<String>,
}

pub fn score_column(question: &str) -> String {
    format!("{question}{FIELD_SEPARATOR}{SCORE_FIELD}")
}

pub fn note_column(question: &str) -> String {
    format!("{question}{FIELD_SEPARATOR}{NOTE_FIELD}")
}

/// Splits a header on the last separator into `(question, field)`.
pub fn split_column(header: &str) -> Option<(&str, &str)> {
    if header == TIME_POINT_COLUMN {
        return None;
    }
    header.rsplit_once(FIELD_SEPARATOR)
}

/// Encodes the grid as a single-sheet table.
///
/// Combinations missing from the grid are written as score `0.0` and an
/// empty note.
pub fn encode<S, T>(
    grid: &DataGrid,
    items: &[S],
    time_points: &[T],
    format: TableFormat,
) -> TableResult<Vec<u8>>
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    let df = frame_from_grid(grid, items, time_points)?;
    let bytes = match format {
        TableFormat::Xlsx => workbook::write_xlsx(&df)?,
        TableFormat::Csv => delimited::write_csv(&df)?,
    };
    tracing::debug!(
        format = format.extension(),
        rows = df.height(),
        columns = df.width(),
        bytes = bytes.len(),
        "encoded table"
    );
    Ok(bytes)
}

/// Decodes a table produced by [`encode`] (or edited by hand).
///
/// Fails as a whole on the first malformed cell; no partial result is
/// returned.
pub fn decode(bytes: &[u8], format: TableFormat) -> TableResult<DecodedTable> {
    let raw = match format {
        TableFormat::Xlsx => workbook::read_xlsx(bytes)?,
        TableFormat::Csv => delimited::read_csv(bytes)?,
    };
    let df = frame::frame_from_raw(&raw)?;
    let decoded = grid_from_frame(&df)?;
    tracing::debug!(
        format = format.extension(),
        rows = df.height(),
        questions = decoded.items.len(),
        "decoded table"
    );
    Ok(decoded)
}

/// Encodes and writes to `path`, picking the format from its extension.
pub fn save_table<S, T, P>(
    grid: &DataGrid,
    items: &[S],
    time_points: &[T],
    path: P,
) -> TableResult<TableFormat>
where
    S: AsRef<str>,
    T: AsRef<str>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let format = TableFormat::from_path(path)?;
    let bytes = encode(grid, items, time_points, format)?;
    fs::write(path, bytes)?;
    Ok(format)
}

/// Reads and decodes `path`, picking the format from its extension.
pub fn load_table<P: AsRef<Path>>(path: P) -> TableResult<DecodedTable> {
    let path = path.as_ref();
    let format = TableFormat::from_path(path)?;
    let bytes = fs::read(path)?;
    decode(&bytes, format)
}
