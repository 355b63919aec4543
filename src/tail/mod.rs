//! Log discovery and tailing.
//!
//! - [`LogLocator`] finds (and pins) the file the process writes to
//! - [`LogTailer`] polls it for growth and yields complete lines
//! - [`LogCursor`] path + confirmed offset + carried partial line

mod cursor;
mod locator;
mod tailer;

pub use cursor::LogCursor;
pub use locator::{FileMark, LogLocator, LogPattern};
pub use tailer::{LogTailer, TailState, MAX_READ_PER_POLL};

use thiserror::Error;

/// Read failures of a single poll. Never surfaced past the tailer.
#[derive(Error, Debug)]
pub(crate) enum TailError {
    /// File temporarily unreadable (rotation race, permissions, vanished).
    #[error("log read failed: {0}")]
    Io(#[from] std::io::Error),

    /// File is shorter than the cursor.
    #[error("log shrank to {len} bytes below read position {position}")]
    Truncated { len: u64, position: u64 },
}
