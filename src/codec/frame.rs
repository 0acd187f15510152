use super::{
    DecodedTable, NOTE_FIELD, SCORE_FIELD, TIME_POINT_COLUMN, TableError, TableResult,
    note_column, score_column, split_column,
};
use crate::grid::{DataGrid, Entry};
use polars::prelude::PlSmallStr;
use polars::prelude::*;
use std::collections::HashSet;

/// Cell as read from a spreadsheet or CSV file, before typing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawCell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl RawCell {
    fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn display(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Number(v) => format_number(*v),
            RawCell::Text(s) => s.clone(),
            RawCell::Bool(b) => b.to_string(),
        }
    }
}

/// Untyped table: header row plus data rows tagged with their 1-based
/// spreadsheet row number.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<(usize, Vec<RawCell>)>,
}

/// Builds the export frame: `时间点` first, then score and note columns per
/// question in question order.
pub fn frame_from_grid<S, T>(grid: &DataGrid, items: &[S], time_points: &[T]) -> PolarsResult<DataFrame>
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    let mut columns: Vec<Column> = Vec::with_capacity(1 + items.len() * 2);

    let labels: Vec<&str> = time_points.iter().map(|tp| tp.as_ref()).collect();
    columns.push(Series::new(PlSmallStr::from_static(TIME_POINT_COLUMN), labels).into_column());

    for item in items {
        let item = item.as_ref();
        let (scores, notes): (Vec<f64>, Vec<String>) = time_points
            .iter()
            .map(|tp| {
                let entry = grid
                    .entry(item, tp.as_ref())
                    .cloned()
                    .unwrap_or_else(Entry::export_default);
                (entry.score, entry.note)
            })
            .unzip();
        columns.push(Series::new(score_column(item).into(), scores).into_column());
        columns.push(Series::new(note_column(item).into(), notes).into_column());
    }

    DataFrame::new(columns)
}

/// Reads a frame shaped like [`frame_from_grid`] output back into a grid.
///
/// Null scores become `0.0`, null notes become empty strings.
pub fn grid_from_frame(df: &DataFrame) -> TableResult<DecodedTable> {
    let time_col = df
        .column(TIME_POINT_COLUMN)
        .map_err(|_| TableError::MissingTimeColumn {
            reason: "header row has no time point column".into(),
        })?
        .str()?;

    let mut items: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for col in df.get_columns() {
        if let Some((question, _)) = split_column(col.name().as_str()) {
            if seen.insert(question.to_string()) {
                items.push(question.to_string());
            }
        }
    }

    let mut grid = DataGrid::new();
    for item in &items {
        grid.ensure_question(item.as_str());
        let scores = match df.column(&score_column(item)) {
            Ok(col) => Some(col.f64()?),
            Err(_) => None,
        };
        let notes = match df.column(&note_column(item)) {
            Ok(col) => Some(col.str()?),
            Err(_) => None,
        };

        for row_idx in 0..df.height() {
            let time_point = time_col.get(row_idx).ok_or_else(|| TableError::MissingTimeColumn {
                reason: format!("data row {} has no time point", row_idx + 1),
            })?;
            let score = scores
                .and_then(|ca| ca.get(row_idx))
                .filter(|v| !v.is_nan())
                .unwrap_or(0.0);
            let note = notes.and_then(|ca| ca.get(row_idx)).unwrap_or("");
            grid.set_entry(item.as_str(), time_point, Entry::new(score, note));
        }
    }

    Ok(DecodedTable { grid, items })
}

/// Types a raw table into the frame layout, validating every cell.
pub(crate) fn frame_from_raw(raw: &RawTable) -> TableResult<DataFrame> {
    let time_idx = raw
        .headers
        .iter()
        .position(|h| h.trim() == TIME_POINT_COLUMN)
        .ok_or_else(|| TableError::MissingTimeColumn {
            reason: "header row has no time point column".into(),
        })?;

    let rows: Vec<&(usize, Vec<RawCell>)> = raw
        .rows
        .iter()
        .filter(|(_, cells)| !cells.iter().all(RawCell::is_blank))
        .collect();

    let cell = |cells: &Vec<RawCell>, idx: usize| -> RawCell {
        cells.get(idx).cloned().unwrap_or(RawCell::Empty)
    };

    let mut time_points: Vec<String> = Vec::with_capacity(rows.len());
    for (row_no, cells) in &rows {
        let value = cell(cells, time_idx);
        if value.is_blank() {
            return Err(TableError::MissingTimeColumn {
                reason: format!("row {row_no} has no time point"),
            });
        }
        time_points.push(value.display().trim().to_string());
    }

    let mut columns: Vec<Column> = Vec::with_capacity(raw.headers.len());
    columns.push(
        Series::new(PlSmallStr::from_static(TIME_POINT_COLUMN), time_points).into_column(),
    );

    let mut taken: HashSet<&str> = HashSet::new();
    for (col_idx, header) in raw.headers.iter().enumerate() {
        // question names are free text; only the time point header is matched trimmed
        if col_idx == time_idx {
            continue;
        }
        let header = header.as_str();
        let Some((_, field)) = split_column(header) else {
            continue;
        };
        if !taken.insert(header) {
            tracing::warn!(column = header, "ignoring duplicate column");
            continue;
        }

        if field == SCORE_FIELD {
            let mut scores: Vec<Option<f64>> = Vec::with_capacity(rows.len());
            for (row_no, cells) in &rows {
                scores.push(coerce_score(&cell(cells, col_idx), header, *row_no)?);
            }
            columns.push(Series::new(header.into(), scores).into_column());
        } else {
            if field != NOTE_FIELD {
                tracing::debug!(column = header, "column with unknown field kept as text");
            }
            let notes: Vec<Option<String>> = rows
                .iter()
                .map(|(_, cells)| coerce_note(&cell(cells, col_idx)))
                .collect();
            columns.push(Series::new(header.into(), notes).into_column());
        }
    }

    Ok(DataFrame::new(columns)?)
}

fn coerce_score(cell: &RawCell, column: &str, row: usize) -> TableResult<Option<f64>> {
    let malformed = || TableError::MalformedScore {
        column: column.to_string(),
        row,
        value: cell.display(),
    };
    match cell {
        RawCell::Empty => Ok(None),
        RawCell::Number(v) if v.is_nan() => Ok(None),
        RawCell::Number(v) => Ok(Some(*v)),
        RawCell::Text(s) if s.trim().is_empty() => Ok(None),
        RawCell::Text(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_nan() => Ok(None),
            Ok(v) => Ok(Some(v)),
            Err(_) => Err(malformed()),
        },
        RawCell::Bool(_) => Err(malformed()),
    }
}

fn coerce_note(cell: &RawCell) -> Option<String> {
    match cell {
        RawCell::Empty => None,
        other => Some(other.display()),
    }
}

/// Integral values print without a fractional part (`2025`, not `2025.0`).
pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn raw(headers: &[&str], rows: Vec<Vec<RawCell>>) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(i, cells)| (i + 2, cells))
                .collect(),
        }
    }

    #[test]
    fn frame_from_grid_orders_columns() {
        let mut grid = DataGrid::new();
        grid.set_entry("B", "2025Q1", Entry::new(10.0, "b"));
        grid.set_entry("A", "2025Q1", Entry::new(20.0, "a"));

        let df = frame_from_grid(&grid, &["B", "A"], &["2025Q1"]).unwrap();
        let names: Vec<String> = df
            .get_columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["时间点", "B - 得分", "B - 说明", "A - 得分", "A - 说明"]
        );
    }

    #[test]
    fn frame_from_grid_uses_export_default_for_gaps() {
        let grid = DataGrid::new();
        let df = frame_from_grid(&grid, &["A"], &["2025"]).unwrap();
        assert_eq!(df.column("A - 得分").unwrap().f64().unwrap().get(0), Some(0.0));
        assert_eq!(df.column("A - 说明").unwrap().str().unwrap().get(0), Some(""));
    }

    #[test]
    fn blank_cells_default_and_numbers_coerce() {
        let table = raw(
            &["时间点", "A - 得分", "A - 说明"],
            vec![
                vec![RawCell::Number(2025.0), RawCell::Empty, RawCell::Number(12.0)],
                vec![text("2026"), text(" 55.5 "), RawCell::Empty],
            ],
        );
        let decoded = grid_from_frame(&frame_from_raw(&table).unwrap()).unwrap();
        assert_eq!(decoded.items, vec!["A"]);
        assert_eq!(decoded.grid.entry("A", "2025"), Some(&Entry::new(0.0, "12")));
        assert_eq!(decoded.grid.entry("A", "2026"), Some(&Entry::new(55.5, "")));
    }

    #[test]
    fn blank_rows_are_skipped() {
        let table = raw(
            &["时间点", "A - 得分"],
            vec![
                vec![text("2025Q1"), RawCell::Number(1.0)],
                vec![RawCell::Empty, RawCell::Empty],
            ],
        );
        let df = frame_from_raw(&table).unwrap();
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn malformed_score_names_column_and_row() {
        let table = raw(
            &["时间点", "A - 得分"],
            vec![
                vec![text("2025Q1"), RawCell::Number(1.0)],
                vec![text("2025Q2"), text("great")],
            ],
        );
        match frame_from_raw(&table) {
            Err(TableError::MalformedScore { column, row, value }) => {
                assert_eq!(column, "A - 得分");
                assert_eq!(row, 3);
                assert_eq!(value, "great");
            }
            other => panic!("expected MalformedScore, got {other:?}"),
        }
    }

    #[test]
    fn missing_time_header_is_rejected() {
        let table = raw(&["when", "A - 得分"], vec![vec![text("x"), RawCell::Number(1.0)]]);
        assert!(matches!(
            frame_from_raw(&table),
            Err(TableError::MissingTimeColumn { .. })
        ));
    }

    #[test]
    fn question_whitespace_survives_decoding() {
        let table = raw(
            &[" 时间点 ", " A - 得分", " A - 说明"],
            vec![vec![text("2025Q1"), RawCell::Number(80.0), text("x")]],
        );
        let decoded = grid_from_frame(&frame_from_raw(&table).unwrap()).unwrap();
        assert_eq!(decoded.items, vec![" A"]);
        assert_eq!(decoded.grid.entry(" A", "2025Q1"), Some(&Entry::new(80.0, "x")));
        assert_eq!(decoded.grid.entry("A", "2025Q1"), None);
    }

    #[test]
    fn question_names_split_on_last_separator() {
        let table = raw(
            &["时间点", "work - life - 得分", "work - life - 说明"],
            vec![vec![text("2025"), RawCell::Number(42.0), text("ok")]],
        );
        let decoded = grid_from_frame(&frame_from_raw(&table).unwrap()).unwrap();
        assert_eq!(decoded.items, vec!["work - life"]);
        assert_eq!(
            decoded.grid.entry("work - life", "2025"),
            Some(&Entry::new(42.0, "ok"))
        );
    }
}
