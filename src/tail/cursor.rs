//! Read cursor into the tailed file.

use std::path::{Path, PathBuf};

use crate::events::RawLogLine;

/// Position of the tailer inside one file.
///
/// `offset` is the byte just past the last confirmed newline; `pending` holds the
/// bytes already read after it that do not end in a newline yet. The next read
/// starts at `offset + pending.len()`.
#[derive(Debug, Clone)]
pub struct LogCursor {
    path: PathBuf,
    offset: u64,
    pending: Vec<u8>,
}

impl LogCursor {
    pub fn new(path: impl Into<PathBuf>, offset: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            pending: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the last confirmed line boundary. Never decreases.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Partial trailing line carried to the next read.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// File position the next read starts from.
    pub fn read_position(&self) -> u64 {
        self.offset + self.pending.len() as u64
    }

    /// Appends freshly read bytes and returns every line they complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<RawLogLine> {
        self.pending.extend_from_slice(bytes);
        let Some(last_nl) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let complete: Vec<u8> = self.pending.drain(..=last_nl).collect();
        self.offset += complete.len() as u64;

        // `complete` ends with '\n', so the final split piece is always empty.
        let mut lines: Vec<RawLogLine> = complete
            .split(|b| *b == b'\n')
            .map(RawLogLine::from_bytes)
            .collect();
        lines.pop();
        lines
    }
}
