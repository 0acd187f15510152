use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Score given to a freshly back-filled entry.
pub const DEFAULT_SCORE: f64 = 70.0;

/// Score/note pair attached to one question at one time point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub score: f64,
    #[serde(default)]
    pub note: String,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            score: DEFAULT_SCORE,
            note: String::new(),
        }
    }
}

impl Entry {
    pub fn new(score: f64, note: impl Into<String>) -> Self {
        Self {
            score,
            note: note.into(),
        }
    }

    /// Value written to a spreadsheet for a combination the grid does not hold.
    pub fn export_default() -> Self {
        Self {
            score: 0.0,
            note: String::new(),
        }
    }
}

/// Question -> time point -> entry.
///
/// The grid carries no ordering of its own; question order lives in the
/// session's item list and time point order comes from the time axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataGrid {
    cells: HashMap<String, HashMap<String, Entry>>,
}

impl DataGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn question_count(&self) -> usize {
        self.cells.len()
    }

    pub fn contains_question(&self, question: &str) -> bool {
        self.cells.contains_key(question)
    }

    /// Questions present in the grid, in no particular order.
    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn entries(&self, question: &str) -> Option<&HashMap<String, Entry>> {
        self.cells.get(question)
    }

    pub fn entry(&self, question: &str, time_point: &str) -> Option<&Entry> {
        self.cells.get(question).and_then(|row| row.get(time_point))
    }

    pub fn entry_mut(&mut self, question: &str, time_point: &str) -> Option<&mut Entry> {
        self.cells
            .get_mut(question)
            .and_then(|row| row.get_mut(time_point))
    }

    pub fn set_entry(
        &mut self,
        question: impl Into<String>,
        time_point: impl Into<String>,
        entry: Entry,
    ) {
        self.cells
            .entry(question.into())
            .or_default()
            .insert(time_point.into(), entry);
    }

    /// Registers a question with no entries yet.
    pub fn ensure_question(&mut self, question: impl Into<String>) {
        self.cells.entry(question.into()).or_default();
    }

    pub fn remove_question(&mut self, question: &str) -> Option<HashMap<String, Entry>> {
        self.cells.remove(question)
    }

    /// Moves every entry of `from` under `to`. Any entries already held by `to`
    /// are replaced, not merged.
    pub fn rename_question(&mut self, from: &str, to: impl Into<String>) -> bool {
        match self.cells.remove(from) {
            Some(entries) => {
                self.cells.insert(to.into(), entries);
                true
            }
            None => false,
        }
    }

    /// Copies every entry of `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &DataGrid) {
        for (question, entries) in &other.cells {
            let row = self.cells.entry(question.clone()).or_default();
            for (time_point, entry) in entries {
                row.insert(time_point.clone(), entry.clone());
            }
        }
    }

    /// True when every `(item, time point)` combination holds an entry.
    pub fn covers<S, T>(&self, items: &[S], time_points: &[T]) -> bool
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        items.iter().all(|item| {
            time_points
                .iter()
                .all(|tp| self.entry(item.as_ref(), tp.as_ref()).is_some())
        })
    }
}

/// Back-fills the default entry for every missing `(item, time point)`.
///
/// Entries that already exist are never touched, including those whose time
/// point fell out of the current range. Running it twice gives the same grid.
pub fn reconcile<S, T>(grid: &DataGrid, items: &[S], time_points: &[T]) -> DataGrid
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    let mut next = grid.clone();
    let mut filled = 0usize;
    for item in items {
        let row = next.cells.entry(item.as_ref().to_string()).or_default();
        for tp in time_points {
            if !row.contains_key(tp.as_ref()) {
                row.insert(tp.as_ref().to_string(), Entry::default());
                filled += 1;
            }
        }
    }
    tracing::debug!(filled, items = items.len(), "reconciled grid");
    next
}
