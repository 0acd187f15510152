use datatrace::codec::{TIME_POINT_COLUMN, frame_from_grid, grid_from_frame};
use datatrace::{DataGrid, Entry, TableError, TableFormat, decode, encode, load_table, save_table};
use std::collections::HashSet;
use tempfile::tempdir;

fn build_sample_grid() -> DataGrid {
    let mut grid = DataGrid::new();
    grid.set_entry("A", "2023Q1", Entry::new(80.0, "Good"));
    grid.set_entry("A", "2023Q2", Entry::new(85.0, "Better"));
    grid.set_entry("B", "2023Q1", Entry::new(60.0, "Okay"));
    grid.set_entry("B", "2023Q2", Entry::new(65.0, "Improved"));
    grid
}

const ITEMS: [&str; 2] = ["A", "B"];
const POINTS: [&str; 2] = ["2023Q1", "2023Q2"];

fn assert_sample_tuples(grid: &DataGrid) {
    assert_eq!(grid.entry("A", "2023Q1"), Some(&Entry::new(80.0, "Good")));
    assert_eq!(grid.entry("A", "2023Q2"), Some(&Entry::new(85.0, "Better")));
    assert_eq!(grid.entry("B", "2023Q1"), Some(&Entry::new(60.0, "Okay")));
    assert_eq!(grid.entry("B", "2023Q2"), Some(&Entry::new(65.0, "Improved")));
}

#[test]
fn xlsx_round_trip_restores_every_entry() {
    let grid = build_sample_grid();
    let bytes = encode(&grid, &ITEMS, &POINTS, TableFormat::Xlsx).unwrap();
    // xlsx files are zip archives
    assert_eq!(&bytes[..2], b"PK");

    let decoded = decode(&bytes, TableFormat::Xlsx).unwrap();
    assert_sample_tuples(&decoded.grid);
    let items: HashSet<&str> = decoded.items.iter().map(String::as_str).collect();
    assert_eq!(items, HashSet::from(["A", "B"]));
}

#[test]
fn csv_round_trip_restores_every_entry() {
    let grid = build_sample_grid();
    let bytes = encode(&grid, &ITEMS, &POINTS, TableFormat::Csv).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.starts_with("时间点,A - 得分,A - 说明,B - 得分,B - 说明"));

    let decoded = decode(&bytes, TableFormat::Csv).unwrap();
    assert_sample_tuples(&decoded.grid);
}

#[test]
fn decoded_items_keep_column_order() {
    let grid = build_sample_grid();
    for format in [TableFormat::Xlsx, TableFormat::Csv] {
        let bytes = encode(&grid, &["B", "A"], &POINTS, format).unwrap();
        assert_eq!(decode(&bytes, format).unwrap().items, vec!["B", "A"]);
    }
}

#[test]
fn question_names_with_surrounding_spaces_round_trip() {
    let mut grid = DataGrid::new();
    grid.set_entry(" A", "2025Q1", Entry::new(80.0, "x"));
    grid.set_entry("B ", "2025Q1", Entry::new(20.0, ""));
    for format in [TableFormat::Xlsx, TableFormat::Csv] {
        let bytes = encode(&grid, &[" A", "B "], &["2025Q1"], format).unwrap();
        let decoded = decode(&bytes, format).unwrap();
        assert_eq!(decoded.items, vec![" A", "B "], "{format}");
        assert_eq!(decoded.grid.entry(" A", "2025Q1"), Some(&Entry::new(80.0, "x")));
        assert_eq!(decoded.grid.entry("B ", "2025Q1"), Some(&Entry::new(20.0, "")));
    }
}

#[test]
fn missing_entries_are_exported_as_zero_and_empty() {
    let mut grid = DataGrid::new();
    grid.set_entry("A", "2023Q1", Entry::new(75.0, "only one"));

    let bytes = encode(&grid, &["A", "C"], &POINTS, TableFormat::Xlsx).unwrap();
    let decoded = decode(&bytes, TableFormat::Xlsx).unwrap();

    assert_eq!(decoded.grid.entry("A", "2023Q1"), Some(&Entry::new(75.0, "only one")));
    assert_eq!(decoded.grid.entry("A", "2023Q2"), Some(&Entry::new(0.0, "")));
    assert_eq!(decoded.grid.entry("C", "2023Q1"), Some(&Entry::new(0.0, "")));
    assert_eq!(decoded.items, vec!["A", "C"]);
}

#[test]
fn out_of_range_scores_pass_through() {
    let mut grid = DataGrid::new();
    grid.set_entry("A", "2025", Entry::new(150.5, ""));
    grid.set_entry("A", "2026", Entry::new(-3.0, ""));

    let bytes = encode(&grid, &["A"], &["2025", "2026"], TableFormat::Xlsx).unwrap();
    let decoded = decode(&bytes, TableFormat::Xlsx).unwrap();
    assert_eq!(decoded.grid.entry("A", "2025").unwrap().score, 150.5);
    assert_eq!(decoded.grid.entry("A", "2026").unwrap().score, -3.0);
}

#[test]
fn csv_blank_score_decodes_as_zero() {
    let csv = "时间点,A - 得分,A - 说明\n2025-01,,note\n2025-02,42,\n";
    let decoded = decode(csv.as_bytes(), TableFormat::Csv).unwrap();
    assert_eq!(decoded.grid.entry("A", "2025-01"), Some(&Entry::new(0.0, "note")));
    assert_eq!(decoded.grid.entry("A", "2025-02"), Some(&Entry::new(42.0, "")));
}

#[test]
fn csv_non_numeric_score_names_column_and_row() {
    let csv = "时间点,A - 得分,A - 说明\n2025Q1,80,ok\n2025Q2,lots,hmm\n";
    let err = decode(csv.as_bytes(), TableFormat::Csv).unwrap_err();
    match &err {
        TableError::MalformedScore { column, row, value } => {
            assert_eq!(column, "A - 得分");
            assert_eq!(*row, 3);
            assert_eq!(value, "lots");
        }
        other => panic!("expected MalformedScore, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("A - 得分") && message.contains("row 3"));
}

#[test]
fn missing_time_column_is_rejected() {
    let csv = "period,A - 得分\n2025Q1,80\n";
    assert!(matches!(
        decode(csv.as_bytes(), TableFormat::Csv),
        Err(TableError::MissingTimeColumn { .. })
    ));
}

#[test]
fn blank_time_point_is_rejected() {
    let csv = "时间点,A - 得分\n2025Q1,80\n,70\n";
    let err = decode(csv.as_bytes(), TableFormat::Csv).unwrap_err();
    assert!(matches!(err, TableError::MissingTimeColumn { .. }));
    assert!(err.to_string().contains("row 3"));
}

#[test]
fn garbage_bytes_are_not_a_workbook() {
    assert!(decode(b"not a spreadsheet", TableFormat::Xlsx).is_err());
}

#[test]
fn save_and_load_pick_format_from_extension() {
    let dir = tempdir().unwrap();
    let grid = build_sample_grid();

    for name in ["scores.xlsx", "scores.csv"] {
        let path = dir.path().join(name);
        let format = save_table(&grid, &ITEMS, &POINTS, &path).unwrap();
        assert_eq!(format.extension(), path.extension().unwrap().to_str().unwrap());
        let decoded = load_table(&path).unwrap();
        assert_sample_tuples(&decoded.grid);
    }

    let bad = dir.path().join("scores.txt");
    assert!(matches!(
        save_table(&grid, &ITEMS, &POINTS, &bad),
        Err(TableError::UnsupportedFormat(_))
    ));
}

#[test]
fn dataframe_layout_matches_export_columns() {
    let df = frame_from_grid(&build_sample_grid(), &ITEMS, &POINTS).unwrap();
    assert_eq!(df.height(), 2);
    assert_eq!(df.width(), 5);
    assert_eq!(df.get_columns()[0].name().as_str(), TIME_POINT_COLUMN);

    let decoded = grid_from_frame(&df).unwrap();
    assert_sample_tuples(&decoded.grid);
}
