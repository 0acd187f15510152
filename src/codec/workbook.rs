use super::frame::{RawCell, RawTable};
use super::{SHEET_NAME, TIME_POINT_COLUMN, TableError, TableResult};
use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use polars::prelude::{AnyValue, DataFrame};
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, XlsxError};
use std::io::Cursor;

const TIME_COLUMN_WIDTH: f64 = 12.0;
const VALUE_COLUMN_WIDTH: f64 = 24.0;

pub(crate) fn write_xlsx(df: &DataFrame) -> TableResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let col = ColNum::try_from(col_idx).map_err(|_| XlsxError::RowColumnLimitError)?;
        let name = column.name().as_str();
        sheet.write_string_with_format(0, col, name, &header_format)?;
        let width = if name == TIME_POINT_COLUMN {
            TIME_COLUMN_WIDTH
        } else {
            VALUE_COLUMN_WIDTH
        };
        sheet.set_column_width(col, width)?;

        for row_idx in 0..df.height() {
            let row = RowNum::try_from(row_idx + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
            match column.get(row_idx)? {
                AnyValue::Null => {}
                AnyValue::Float64(v) => {
                    sheet.write_number(row, col, v)?;
                }
                AnyValue::String(s) => {
                    sheet.write_string(row, col, s)?;
                }
                AnyValue::StringOwned(s) => {
                    sheet.write_string(row, col, s.as_str())?;
                }
                other => {
                    sheet.write_string(row, col, other.to_string())?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Reads the first worksheet. The first non-empty row is the header row.
pub(crate) fn read_xlsx(bytes: &[u8]) -> TableResult<RawTable> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TableError::EmptyWorkbook)??;

    // calamine trims leading empty rows; keep reported row numbers absolute
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|cell| cell.to_string()).collect(),
        None => {
            return Err(TableError::MissingTimeColumn {
                reason: "worksheet is empty".into(),
            });
        }
    };

    let rows = rows
        .enumerate()
        .map(|(idx, cells)| {
            let row_no = first_row + idx + 2;
            (row_no, cells.iter().map(raw_cell).collect())
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn raw_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::Int(v) => RawCell::Number(*v as f64),
        Data::Float(v) => RawCell::Number(*v),
        Data::DateTime(dt) => RawCell::Number(dt.as_f64()),
        Data::Bool(b) => RawCell::Bool(*b),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Error(err) => RawCell::Text(err.to_string()),
    }
}
