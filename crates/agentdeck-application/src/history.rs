//! Prompt history recall.
//!
//! Keeps the submitted inputs of the session and a cursor into them. The
//! cursor is `None` when the prompt shows fresh input rather than a recalled
//! entry.

/// What the prompt should show after a history step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recall {
    /// Replace the input with this entry.
    Show(String),
    /// Stepped past the newest entry; clear the input.
    Clear,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryNavigator {
    entries: Vec<String>,
    cursor: Option<usize>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a submitted input and resets the cursor.
    pub fn push(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        if !entry.trim().is_empty() {
            self.entries.push(entry);
        }
        self.cursor = None;
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Steps to an older entry.
    ///
    /// Starts at the newest entry and stops at the oldest. Returns `None`
    /// only when there is no history at all.
    pub fn previous(&mut self) -> Option<Recall> {
        let last = self.entries.len().checked_sub(1)?;
        let index = match self.cursor {
            None => last,
            Some(index) => index.saturating_sub(1),
        };
        self.cursor = Some(index);
        Some(Recall::Show(self.entries[index].clone()))
    }

    /// Steps to a newer entry.
    ///
    /// Past the newest entry the cursor resets and the input is cleared once;
    /// further steps do nothing.
    pub fn next(&mut self) -> Option<Recall> {
        let index = self.cursor?;
        if index + 1 < self.entries.len() {
            self.cursor = Some(index + 1);
            Some(Recall::Show(self.entries[index + 1].clone()))
        } else {
            self.cursor = None;
            Some(Recall::Clear)
        }
    }
}
