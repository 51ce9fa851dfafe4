//! Command line editing state and command history.

/// Previously submitted commands with a recall cursor.
///
/// A cursor equal to the history length means "not recalling".
#[derive(Debug, Default)]
pub struct CommandHistory {
    entries: Vec<String>,
    shown: usize,
}

#[derive(Debug, PartialEq)]
pub enum Recall<'a> {
    Entry(&'a str),
    Blank,
}

impl CommandHistory {
    pub fn push(&mut self, cmd: impl Into<String>) {
        self.entries.push(cmd.into());
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.shown
    }

    pub fn reset_cursor(&mut self) {
        self.shown = self.entries.len();
    }

    pub fn recall_previous(&mut self) -> Recall<'_> {
        self.shown = self.shown.saturating_sub(1);
        self.recall()
    }

    pub fn recall_next(&mut self) -> Recall<'_> {
        self.shown = (self.shown + 1).min(self.entries.len());
        self.recall()
    }

    fn recall(&self) -> Recall<'_> {
        match self.entries.get(self.shown) {
            Some(entry) => Recall::Entry(entry),
            None => Recall::Blank,
        }
    }
}

/// Text typed by the user. Cursor is a char index.
#[derive(Debug, Default)]
pub struct CommandLine {
    buffer: Vec<char>,
    cursor: usize,
    /// Editing is disabled while a command executes.
    pub read_only: bool,
}

impl CommandLine {
    pub fn text(&self) -> String {
        self.buffer.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replace content, the cursor moves to the end.
    pub fn set(&mut self, text: &str) {
        self.buffer = text.chars().collect();
        self.cursor = self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    pub fn take(&mut self) -> String {
        let text = self.text();
        self.clear();
        text
    }

    pub fn insert(&mut self, c: char) {
        if self.read_only {
            return;
        }
        self.buffer.insert(self.cursor, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.read_only || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        self.buffer.remove(self.cursor);
    }

    pub fn delete(&mut self) {
        if self.read_only || self.cursor >= self.buffer.len() {
            return;
        }
        self.buffer.remove(self.cursor);
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.buffer.len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.buffer.len();
    }
}
