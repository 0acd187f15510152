use crate::chart::{self, ChartOptions, OutputFormat, RenderError};
use crate::codec::{self, TableError, TableFormat};
use crate::config::SessionConfig;
use crate::grid::{DataGrid, Entry, reconcile};
use crate::style::{StyleConfig, StyleError};
use crate::timeline::{Granularity, TimeConfig};
use chrono::NaiveDate;
use thiserror::Error;

/// Reflection questions a new session starts with.
pub const DEFAULT_QUESTIONS: [&str; 8] = [
    "我的身体有多健康？",
    "我有多少自在闲暇？",
    "我的内心有多安宁平和？",
    "我感到多少爱与被爱？",
    "我做了多少满意的善行？",
    "我体验了丰富的风景和故事？",
    "我有多少自我觉察、理解和同情？",
    "我增进了多少成长和智慧？",
];

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("question name must not be empty")]
    EmptyQuestionName,
    #[error("question '{0}' already exists")]
    DuplicateQuestion(String),
    #[error("question index {index} out of range (have {len} questions)")]
    QuestionIndexOutOfRange { index: usize, len: usize },
    #[error("unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("time point '{0}' is not in the configured range")]
    UnknownTimePoint(String),
    #[error("score {0} outside 0..=100")]
    ScoreOutOfRange(f64),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Style(#[from] StyleError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Everything one user is editing: the ordered question list, the score
/// grid, the time axis and the chart style.
///
/// Mutations never touch `self`; they return the next session, so a failed
/// call leaves the caller's state as it was.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    items: Vec<String>,
    grid: DataGrid,
    time_config: TimeConfig,
    style: StyleConfig,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::assemble(
            DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect(),
            DataGrid::new(),
            TimeConfig::default(),
            StyleConfig::default(),
        )
    }

    pub fn from_config(config: &SessionConfig) -> SessionResult<Self> {
        config.style.validate()?;
        let mut items: Vec<String> = Vec::with_capacity(config.items.len());
        for item in &config.items {
            let name = clean_name(item)?;
            if items.contains(&name) {
                return Err(SessionError::DuplicateQuestion(name));
            }
            items.push(name);
        }
        Ok(Self::assemble(
            items,
            DataGrid::new(),
            config.time.clone(),
            config.style.clone(),
        ))
    }

    /// Swaps in the questions, time axis and style of `config`. Entries of
    /// questions that stay are kept; questions left out are dropped with
    /// their entries.
    pub fn apply_config(&self, config: &SessionConfig) -> SessionResult<Session> {
        let fresh = Self::from_config(config)?;
        let mut grid = self.grid.clone();
        for old in self.items.iter().filter(|old| !fresh.items.contains(*old)) {
            grid.remove_question(old);
            tracing::debug!(question = %old, "dropped question not in config");
        }
        Ok(Self::assemble(
            fresh.items,
            grid,
            fresh.time_config,
            fresh.style,
        ))
    }

    fn assemble(items: Vec<String>, grid: DataGrid, time_config: TimeConfig, style: StyleConfig) -> Self {
        let session = Self {
            items,
            grid,
            time_config,
            style,
        };
        session.reconciled()
    }

    fn reconciled(mut self) -> Self {
        let time_points = self.time_config.time_points();
        self.grid = reconcile(&self.grid, &self.items, &time_points);
        self
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn grid(&self) -> &DataGrid {
        &self.grid
    }

    pub fn time_config(&self) -> &TimeConfig {
        &self.time_config
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn time_points(&self) -> Vec<String> {
        self.time_config.time_points()
    }

    pub fn item_colors(&self) -> Vec<String> {
        self.style.colors_for(self.items.len())
    }

    pub fn config(&self) -> SessionConfig {
        SessionConfig {
            time: self.time_config.clone(),
            items: self.items.clone(),
            style: self.style.clone(),
        }
    }

    fn check_index(&self, index: usize) -> SessionResult<()> {
        if index >= self.items.len() {
            return Err(SessionError::QuestionIndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(())
    }

    /// Appends a question. Without a name it becomes `题项{n}` with `n` one
    /// past the current count, bumped until unused.
    pub fn add_question(&self, name: Option<&str>) -> SessionResult<Session> {
        let name = match name {
            Some(name) => {
                let name = clean_name(name)?;
                if self.items.contains(&name) {
                    return Err(SessionError::DuplicateQuestion(name));
                }
                name
            }
            None => {
                let mut n = self.items.len() + 1;
                loop {
                    let candidate = format!("题项{n}");
                    if !self.items.contains(&candidate) {
                        break candidate;
                    }
                    n += 1;
                }
            }
        };

        tracing::debug!(question = %name, "adding question");
        let mut next = self.clone();
        next.items.push(name.clone());
        next.grid.ensure_question(name);
        Ok(next.reconciled())
    }

    /// Removes the question at `index` together with all of its entries.
    pub fn delete_question(&self, index: usize) -> SessionResult<Session> {
        self.check_index(index)?;
        let mut next = self.clone();
        let removed = next.items.remove(index);
        next.grid.remove_question(&removed);
        tracing::debug!(question = %removed, "deleted question");
        Ok(next.reconciled())
    }

    /// Renames the question at `index`; its entries move to the new name.
    pub fn rename_question(&self, index: usize, name: &str) -> SessionResult<Session> {
        self.check_index(index)?;
        let name = clean_name(name)?;
        let old = &self.items[index];
        if *old == name {
            return Ok(self.clone());
        }
        if self.items.contains(&name) {
            return Err(SessionError::DuplicateQuestion(name));
        }

        let mut next = self.clone();
        next.grid.rename_question(old, name.clone());
        tracing::debug!(from = %old, to = %name, "renamed question");
        next.items[index] = name;
        Ok(next.reconciled())
    }

    /// Changes the time axis. Entries outside the new range are kept.
    pub fn set_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> SessionResult<Session> {
        let mut next = self.clone();
        next.time_config = TimeConfig::new(start, end, granularity);
        let next = next.reconciled();
        tracing::debug!(
            %start,
            %end,
            granularity = granularity.as_str(),
            time_points = next.time_points().len(),
            "changed time range"
        );
        Ok(next)
    }

    pub fn set_style(&self, style: StyleConfig) -> SessionResult<Session> {
        style.validate()?;
        let mut next = self.clone();
        next.style = style;
        Ok(next)
    }

    /// Replaces the entry of `item` at `time_point`. Both must be part of
    /// the current configuration.
    pub fn update_entry(&self, item: &str, time_point: &str, entry: Entry) -> SessionResult<Session> {
        if !self.items.iter().any(|i| i == item) {
            return Err(SessionError::UnknownQuestion(item.to_string()));
        }
        if !self.time_points().iter().any(|tp| tp == time_point) {
            return Err(SessionError::UnknownTimePoint(time_point.to_string()));
        }
        if !(MIN_SCORE..=MAX_SCORE).contains(&entry.score) {
            return Err(SessionError::ScoreOutOfRange(entry.score));
        }
        let mut next = self.clone();
        next.grid.set_entry(item, time_point, entry);
        Ok(next)
    }

    pub fn update_score(&self, item: &str, time_point: &str, score: f64) -> SessionResult<Session> {
        let note = self.current_entry(item, time_point).note;
        self.update_entry(item, time_point, Entry::new(score, note))
    }

    pub fn update_note(&self, item: &str, time_point: &str, note: &str) -> SessionResult<Session> {
        let score = self.current_entry(item, time_point).score;
        self.update_entry(item, time_point, Entry::new(score, note))
    }

    fn current_entry(&self, item: &str, time_point: &str) -> Entry {
        self.grid
            .entry(item, time_point)
            .cloned()
            .unwrap_or_default()
    }

    /// Encodes the current questions and time axis as a table.
    pub fn export_table(&self, format: TableFormat) -> SessionResult<Vec<u8>> {
        let time_points = self.time_points();
        let bytes = codec::encode(&self.grid, &self.items, &time_points, format)?;
        tracing::info!(
            format = format.extension(),
            questions = self.items.len(),
            time_points = time_points.len(),
            "exported table"
        );
        Ok(bytes)
    }

    /// Decodes a table and merges it in: unseen questions are appended in
    /// column order, imported entries replace existing ones, nothing is
    /// removed. Imported names are trimmed like any other question name.
    /// A decode failure returns the error and no new session.
    pub fn import_table(&self, bytes: &[u8], format: TableFormat) -> SessionResult<Session> {
        let decoded = codec::decode(bytes, format)?;
        let mut incoming = DataGrid::new();
        let mut next = self.clone();
        let mut added = 0usize;
        for item in &decoded.items {
            let name = clean_name(item)?;
            if let Some(entries) = decoded.grid.entries(item) {
                for (time_point, entry) in entries {
                    incoming.set_entry(name.as_str(), time_point.as_str(), entry.clone());
                }
            }
            if !next.items.contains(&name) {
                next.items.push(name);
                added += 1;
            }
        }
        next.grid.merge(&incoming);
        tracing::info!(
            format = format.extension(),
            questions = decoded.items.len(),
            added,
            "imported table"
        );
        Ok(next.reconciled())
    }

    /// Chart options derived from the session style.
    pub fn chart_options(&self, format: OutputFormat, dpi: u32) -> ChartOptions {
        ChartOptions {
            format,
            dpi,
            background: self.style.background_color.clone(),
            font_path: self.style.font_path.clone(),
            font_family: self.style.font_family.clone(),
        }
    }

    pub fn render_chart(&self, options: &ChartOptions) -> SessionResult<Vec<u8>> {
        let time_points = self.time_points();
        let colors = self.item_colors();
        Ok(chart::render_chart(
            &self.grid,
            &self.items,
            &time_points,
            &colors,
            options,
        )?)
    }
}

fn clean_name(name: &str) -> SessionResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SessionError::EmptyQuestionName);
    }
    Ok(name.to_string())
}
