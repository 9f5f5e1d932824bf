//! The scrollback transcript: an append-only log of input/output entries.
//!
//! Every non-empty input line appends exactly one `Input` entry, followed by
//! exactly one `Output` entry once its command finishes — `clear` is the one
//! exception, truncating the log and emitting nothing. Output text may carry
//! ANSI highlighting; untrusted content is sanitized by the executors before
//! it gets here (see `utils::sanitize_text`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Input,
    Output,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub kind: EntryKind,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push_input(&mut self, text: impl Into<String>) {
        self.entries.push(Entry {
            kind: EntryKind::Input,
            text: text.into(),
        });
    }

    pub fn push_output(&mut self, text: impl Into<String>) {
        self.entries.push(Entry {
            kind: EntryKind::Output,
            text: text.into(),
        });
    }

    /// Truncate the whole transcript. Idempotent.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries appended after position `from` — what the view layer renders
    /// incrementally after each dispatch.
    pub fn since(&self, from: usize) -> &[Entry] {
        &self.entries[from.min(self.entries.len())..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
