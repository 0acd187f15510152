use chrono::NaiveDate;
use datatrace::timeline::quarter_of;
use datatrace::{Granularity, TimeConfig, TimelineError, generate_time_points};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn full_year_by_quarter() {
    assert_eq!(
        generate_time_points(d(2025, 1, 1), d(2025, 12, 31), Granularity::Quarter),
        vec!["2025Q1", "2025Q2", "2025Q3", "2025Q4"]
    );
}

#[test]
fn first_quarter_by_month() {
    assert_eq!(
        generate_time_points(d(2025, 1, 1), d(2025, 3, 31), Granularity::Month),
        vec!["2025-01", "2025-02", "2025-03"]
    );
}

#[test]
fn full_year_by_year() {
    assert_eq!(
        generate_time_points(d(2025, 1, 1), d(2025, 12, 31), Granularity::Year),
        vec!["2025"]
    );
}

#[test]
fn quarters_roll_over_the_year() {
    assert_eq!(
        generate_time_points(d(2024, 11, 1), d(2025, 2, 1), Granularity::Quarter),
        vec!["2024Q4", "2025Q1"]
    );
}

#[test]
fn months_roll_over_the_year() {
    assert_eq!(
        generate_time_points(d(2024, 11, 1), d(2025, 2, 1), Granularity::Month),
        vec!["2024-11", "2024-12", "2025-01", "2025-02"]
    );
}

#[test]
fn reversed_range_is_empty_for_every_granularity() {
    for g in Granularity::variants() {
        assert!(generate_time_points(d(2025, 6, 1), d(2025, 5, 31), g).is_empty());
    }
}

#[test]
fn single_day_gives_its_own_period() {
    let day = d(2023, 8, 15);
    assert_eq!(generate_time_points(day, day, Granularity::Quarter), vec!["2023Q3"]);
    assert_eq!(generate_time_points(day, day, Granularity::Month), vec!["2023-08"]);
    assert_eq!(generate_time_points(day, day, Granularity::Year), vec!["2023"]);
}

#[test]
fn quarter_sequence_has_four_labels_per_year() {
    let points = generate_time_points(d(2020, 1, 1), d(2024, 12, 31), Granularity::Quarter);
    assert_eq!(points.len(), 20);
    for (i, label) in points.iter().enumerate() {
        let year = 2020 + (i / 4) as i32;
        let quarter = i % 4 + 1;
        assert_eq!(label, &format!("{year}Q{quarter}"));
    }
}

#[test]
fn sequences_are_sorted_contiguous_and_cover_the_range() {
    let ranges = [
        (d(2019, 2, 28), d(2021, 7, 4)),
        (d(2024, 12, 31), d(2025, 1, 1)),
        (d(2000, 1, 1), d(2000, 1, 1)),
        (d(1999, 10, 10), d(2003, 3, 3)),
    ];
    for (start, end) in ranges {
        let months = generate_time_points(start, end, Granularity::Month);
        assert_eq!(months.first().unwrap(), &start.format("%Y-%m").to_string());
        assert_eq!(months.last().unwrap(), &end.format("%Y-%m").to_string());
        assert!(months.windows(2).all(|w| w[0] < w[1]));

        let quarters = generate_time_points(start, end, Granularity::Quarter);
        let expected_len = {
            use chrono::Datelike;
            let idx = |dt: NaiveDate| dt.year() * 4 + quarter_of(&dt) as i32;
            (idx(end) - idx(start) + 1) as usize
        };
        assert_eq!(quarters.len(), expected_len);
        assert!(quarters.windows(2).all(|w| w[0] < w[1]));

        let years = generate_time_points(start, end, Granularity::Year);
        let span: Vec<String> = (start.format("%Y").to_string().parse::<i32>().unwrap()
            ..=end.format("%Y").to_string().parse::<i32>().unwrap())
            .map(|y| y.to_string())
            .collect();
        assert_eq!(years, span);
    }
}

#[test]
fn generation_is_deterministic() {
    let a = generate_time_points(d(2022, 3, 3), d(2024, 9, 9), Granularity::Month);
    let b = generate_time_points(d(2022, 3, 3), d(2024, 9, 9), Granularity::Month);
    assert_eq!(a, b);
}

#[test]
fn granularity_parses_english_and_chinese_labels() {
    assert_eq!("Quarter".parse::<Granularity>().unwrap(), Granularity::Quarter);
    assert_eq!("季度".parse::<Granularity>().unwrap(), Granularity::Quarter);
    assert_eq!("m".parse::<Granularity>().unwrap(), Granularity::Month);
    assert_eq!("月份".parse::<Granularity>().unwrap(), Granularity::Month);
    assert_eq!(" year ".parse::<Granularity>().unwrap(), Granularity::Year);
    assert_eq!("年度".parse::<Granularity>().unwrap(), Granularity::Year);
    assert_eq!(
        "week".parse::<Granularity>(),
        Err(TimelineError::InvalidGranularity("week".into()))
    );
}

#[test]
fn default_time_config_is_the_current_year_by_quarter() {
    let config = TimeConfig::default();
    assert_eq!(config.granularity, Granularity::Quarter);
    assert_eq!(config.time_points().len(), 4);
}
