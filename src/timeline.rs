use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("invalid granularity '{0}' (expected quarter, month or year)")]
    InvalidGranularity(String),
}

/// Period size used to enumerate time points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Quarter,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Quarter => "quarter",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }

    pub fn variants() -> [Granularity; 3] {
        [Granularity::Quarter, Granularity::Month, Granularity::Year]
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quarter" | "quarterly" | "q" | "季度" => Ok(Granularity::Quarter),
            "month" | "monthly" | "m" | "月份" => Ok(Granularity::Month),
            "year" | "yearly" | "y" | "年度" => Ok(Granularity::Year),
            _ => Err(TimelineError::InvalidGranularity(s.to_string())),
        }
    }
}

/// Quarter index (1..=4) of a date.
pub fn quarter_of<D: Datelike>(date: &D) -> u32 {
    date.month0() / 3 + 1
}

/// Enumerate the period labels covering `start..=end`.
///
/// Labels are `YYYYQn`, `YYYY-MM` or `YYYY`. The period containing `start`
/// is always the first element, even when `start` falls mid-period. A
/// reversed range yields an empty sequence.
pub fn generate_time_points(
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
) -> Vec<String> {
    if start > end {
        return Vec::new();
    }

    let points = match granularity {
        Granularity::Quarter => step_periods(
            (start.year(), quarter_of(&start)),
            (end.year(), quarter_of(&end)),
            4,
            |year, quarter| format!("{year}Q{quarter}"),
        ),
        Granularity::Month => step_periods(
            (start.year(), start.month()),
            (end.year(), end.month()),
            12,
            |year, month| format!("{year}-{month:02}"),
        ),
        Granularity::Year => (start.year()..=end.year())
            .map(|year| year.to_string())
            .collect(),
    };

    tracing::debug!(
        %start,
        %end,
        granularity = granularity.as_str(),
        count = points.len(),
        "generated time points"
    );
    points
}

// Walks (year, period) pairs inclusively, rolling over after `periods_per_year`.
fn step_periods<F>(from: (i32, u32), to: (i32, u32), periods_per_year: u32, label: F) -> Vec<String>
where
    F: Fn(i32, u32) -> String,
{
    let mut points = Vec::new();
    let (mut year, mut period) = from;
    while (year, period) <= to {
        points.push(label(year, period));
        period += 1;
        if period > periods_per_year {
            period = 1;
            year += 1;
        }
    }
    points
}

/// Time range and granularity currently configured for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub granularity: Granularity,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default(),
            granularity: Granularity::Quarter,
        }
    }
}

impl TimeConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, granularity: Granularity) -> Self {
        Self {
            start_date,
            end_date,
            granularity,
        }
    }

    pub fn time_points(&self) -> Vec<String> {
        generate_time_points(self.start_date, self.end_date, self.granularity)
    }
}
