use super::TableResult;
use super::frame::{RawCell, RawTable};
use polars::prelude::{AnyValue, DataFrame};

pub(crate) fn write_csv(df: &DataFrame) -> TableResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let columns = df.get_columns();
    writer.write_record(columns.iter().map(|c| c.name().as_str()))?;

    for row_idx in 0..df.height() {
        let mut record: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            let value = match column.get(row_idx)? {
                AnyValue::Null => String::new(),
                AnyValue::Float64(v) => v.to_string(),
                AnyValue::String(s) => s.to_string(),
                AnyValue::StringOwned(s) => s.to_string(),
                other => other.to_string(),
            };
            record.push(value);
        }
        writer.write_record(&record)?;
    }

    writer.into_inner().map_err(|err| err.into_error().into())
}

pub(crate) fn read_csv(bytes: &[u8]) -> TableResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let row_no = record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(idx + 2);
        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    RawCell::Empty
                } else {
                    RawCell::Text(field.to_string())
                }
            })
            .collect();
        rows.push((row_no, cells));
    }

    Ok(RawTable { headers, rows })
}
