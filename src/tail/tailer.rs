//! # Log tailer.
//!
//! Polls the located file for growth and yields complete lines only.
//!
//! ## State machine
//! ```text
//!            locate() ok                 process gone AND
//! NOT_FOUND ────────────► TAILING ──────────────────────────────► CLOSED
//!     │                                  no growth on 2 consecutive polls
//!     └──────────────────────────────────────────────────────────────┘
//!            process gone AND nothing located on 2 consecutive polls
//! ```
//!
//! ## Rules
//! - Each poll reads from `offset + pending` to EOF (at most [`MAX_READ_PER_POLL`] bytes).
//! - A trailing fragment without `\n` is carried, never emitted early, never lost.
//! - Read failures keep the cursor and are retried on the next poll.
//! - A file shorter than the cursor (truncated) is left alone; the cursor never moves back.

use std::io::SeekFrom;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use super::{cursor::LogCursor, locator::LogLocator, TailError};
use crate::events::RawLogLine;

/// Upper bound of bytes consumed by a single poll.
pub const MAX_READ_PER_POLL: u64 = 1024 * 1024;

/// Consecutive quiet polls after process exit before the tailer closes.
const QUIET_POLLS_TO_CLOSE: u8 = 2;

/// Tailer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    /// No log file located yet.
    NotFound,
    /// Reading the located file.
    Tailing,
    /// Process gone and output drained; no further reads.
    Closed,
}

/// Incremental reader over the run's log file.
#[derive(Debug)]
pub struct LogTailer {
    locator: LogLocator,
    cursor: Option<LogCursor>,
    state: TailState,
    last_grew: bool,
    quiet_polls: u8,
    truncation_reported: bool,
}

impl LogTailer {
    /// Creates a tailer in `NotFound` state.
    pub fn new(locator: LogLocator) -> Self {
        Self {
            locator,
            cursor: None,
            state: TailState::NotFound,
            last_grew: false,
            quiet_polls: 0,
            truncation_reported: false,
        }
    }

    pub fn state(&self) -> TailState {
        self.state
    }

    pub fn cursor(&self) -> Option<&LogCursor> {
        self.cursor.as_ref()
    }

    /// Reads newly appended bytes and returns the lines they complete.
    pub async fn poll(&mut self) -> Vec<RawLogLine> {
        self.last_grew = false;
        if self.state == TailState::Closed {
            return Vec::new();
        }

        if self.cursor.is_none() {
            let Some(path) = self.locator.locate().await else {
                return Vec::new();
            };
            let start = self.locator.start_offset(&path);
            debug!(path = %path.display(), start, "tailing");
            self.cursor = Some(LogCursor::new(path, start));
            self.state = TailState::Tailing;
        }

        let Some(cursor) = self.cursor.as_mut() else {
            return Vec::new();
        };
        match read_appended(cursor).await {
            Ok(bytes) if bytes.is_empty() => Vec::new(),
            Ok(bytes) => {
                self.last_grew = true;
                cursor.feed(&bytes)
            }
            Err(TailError::Truncated { len, position }) => {
                if !self.truncation_reported {
                    warn!(
                        path = %cursor.path().display(),
                        len,
                        position,
                        "log file shrank; waiting for it to grow past the cursor"
                    );
                    self.truncation_reported = true;
                }
                Vec::new()
            }
            Err(e) => {
                debug!(
                    path = %cursor.path().display(),
                    error = %e,
                    "transient read failure; retrying next poll"
                );
                Vec::new()
            }
        }
    }

    /// Feeds process liveness after a poll and returns the resulting state.
    pub fn observe_liveness(&mut self, process_running: bool) -> TailState {
        if self.state == TailState::Closed {
            return self.state;
        }
        if process_running || self.last_grew {
            self.quiet_polls = 0;
            return self.state;
        }

        self.quiet_polls += 1;
        if self.quiet_polls >= QUIET_POLLS_TO_CLOSE {
            if let Some(c) = &self.cursor {
                if !c.pending().is_empty() {
                    debug!(bytes = c.pending().len(), "closing with unterminated final fragment");
                }
            }
            self.state = TailState::Closed;
        }
        self.state
    }
}

async fn read_appended(cursor: &LogCursor) -> Result<Vec<u8>, TailError> {
    let mut file = tokio::fs::File::open(cursor.path()).await?;
    let len = file.metadata().await?.len();
    let position = cursor.read_position();
    if len < position {
        return Err(TailError::Truncated { len, position });
    }
    if len == position {
        return Ok(Vec::new());
    }

    file.seek(SeekFrom::Start(position)).await?;
    let mut buf = Vec::with_capacity((len - position).min(MAX_READ_PER_POLL) as usize);
    file.take(MAX_READ_PER_POLL).read_to_end(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tail::LogPattern;
    use std::io::Write;
    use std::path::Path;

    fn tailer(dir: &Path) -> LogTailer {
        LogTailer::new(LogLocator::new(dir, LogPattern::Fixed("sim.log".into())).unwrap())
    }

    fn append(path: &Path, bytes: &[u8]) {
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        f.write_all(bytes).unwrap();
    }

    fn texts(lines: Vec<RawLogLine>) -> Vec<String> {
        lines.into_iter().map(|l| l.as_str().to_string()).collect()
    }

    #[tokio::test]
    async fn test_not_found_until_file_appears() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = tailer(tmp.path());
        assert!(t.poll().await.is_empty());
        assert_eq!(t.state(), TailState::NotFound);

        append(&tmp.path().join("sim.log"), b"INFO  MAIN : up\n");
        assert_eq!(texts(t.poll().await), vec!["INFO  MAIN : up"]);
        assert_eq!(t.state(), TailState::Tailing);
    }

    #[tokio::test]
    async fn test_unterminated_fragment_waits_for_newline() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sim.log");
        let mut t = tailer(tmp.path());

        append(&path, b"Altitude: 10");
        assert!(t.poll().await.is_empty());
        assert!(t.poll().await.is_empty());

        append(&path, b"523.4 m\n");
        assert_eq!(texts(t.poll().await), vec!["Altitude: 10523.4 m"]);
        assert!(t.poll().await.is_empty());
        assert_eq!(t.cursor().unwrap().offset(), 20);
    }

    #[tokio::test]
    async fn test_concatenation_matches_appended_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sim.log");
        let mut t = tailer(tmp.path());

        let mut written = Vec::new();
        let mut emitted = Vec::new();
        let chunks: [&[u8]; 6] = [b"a", b"bc\nde", b"f\n\n", b"g\xffh", b"\nij\nk", b"l"];
        let mut last_offset = 0;
        for chunk in chunks {
            append(&path, chunk);
            written.extend_from_slice(chunk);
            for line in t.poll().await {
                emitted.push(line.as_str().to_string());
            }
            let offset = t.cursor().unwrap().offset();
            assert!(offset >= last_offset);
            last_offset = offset;
        }

        let upto = written.iter().rposition(|b| *b == b'\n').unwrap() + 1;
        let expected = String::from_utf8_lossy(&written[..upto]).into_owned();
        let rebuilt: String = emitted.iter().map(|l| format!("{l}\n")).collect();
        assert_eq!(rebuilt, expected);
        assert_eq!(t.cursor().unwrap().pending(), b"kl");
    }

    #[tokio::test]
    async fn test_baseline_skips_preexisting_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sim.log");
        append(&path, b"previous run\n");

        let mut loc = LogLocator::new(tmp.path(), LogPattern::Fixed("sim.log".into())).unwrap();
        loc.record_baseline().await;
        let mut t = LogTailer::new(loc);

        append(&path, b"this run\n");
        assert_eq!(texts(t.poll().await), vec!["this run"]);
    }

    #[tokio::test]
    async fn test_closes_after_two_quiet_polls_once_process_gone() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sim.log");
        let mut t = tailer(tmp.path());

        append(&path, b"one\n");
        t.poll().await;
        assert_eq!(t.observe_liveness(true), TailState::Tailing);

        append(&path, b"two\n");
        assert_eq!(texts(t.poll().await), vec!["two"]);
        assert_eq!(t.observe_liveness(false), TailState::Tailing);

        t.poll().await;
        assert_eq!(t.observe_liveness(false), TailState::Tailing);
        t.poll().await;
        assert_eq!(t.observe_liveness(false), TailState::Closed);
        assert!(t.poll().await.is_empty());
    }

    #[tokio::test]
    async fn test_closes_without_file_when_process_gone() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = tailer(tmp.path());
        t.poll().await;
        assert_eq!(t.observe_liveness(false), TailState::NotFound);
        t.poll().await;
        assert_eq!(t.observe_liveness(false), TailState::Closed);
    }

    #[tokio::test]
    async fn test_truncated_file_keeps_cursor() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sim.log");
        let mut t = tailer(tmp.path());

        append(&path, b"first line\n");
        t.poll().await;
        std::fs::write(&path, b"x\n").unwrap();
        assert!(t.poll().await.is_empty());
        assert_eq!(t.cursor().unwrap().offset(), 11);
    }

    #[tokio::test]
    async fn test_vanished_file_keeps_cursor_and_retries() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sim.log");
        let mut t = tailer(tmp.path());

        append(&path, b"before
");
        assert_eq!(texts(t.poll().await), vec!["before"]);

        std::fs::remove_file(&path).unwrap();
        assert!(t.poll().await.is_empty());
        assert_eq!(t.state(), TailState::Tailing);
        assert_eq!(t.cursor().unwrap().offset(), 7);

        std::fs::write(&path, b"before
after
").unwrap();
        assert_eq!(texts(t.poll().await), vec!["after"]);
        assert_eq!(t.cursor().unwrap().offset(), 13);
    }
}
