//! # Log file discovery.
//!
//! [`LogLocator`] finds the one file the supervised process writes to. It is
//! polled by the tailer until it succeeds, then the path stays pinned for the
//! rest of the run.
//!
//! ## Rules
//! - A missing log directory is created on the first call, and reported as `None`.
//! - [`LogPattern::Fixed`] always resolves to that file once it exists.
//! - [`LogPattern::Glob`] resolves to the most recently modified match
//!   (ties broken by the greater file name).
//! - A match recorded by [`record_baseline`](LogLocator::record_baseline) is a
//!   stale log of an earlier run until its size or mtime changes; it is never pinned.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex::Regex;
use tracing::{debug, info};

/// How the log file name is matched inside the log directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogPattern {
    /// One well-known file name.
    Fixed(String),
    /// Shell-style pattern over file names (`*` any run, `?` one char).
    Glob(String),
}

impl Default for LogPattern {
    fn default() -> Self {
        LogPattern::Fixed("sls_simulation.log".to_string())
    }
}

/// Size and mtime of a log file seen before the run started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileMark {
    pub len: u64,
    pub modified: SystemTime,
}

impl FileMark {
    fn of(meta: &std::fs::Metadata) -> Self {
        Self {
            len: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }

    /// True when `now` shows no write since this mark was taken.
    fn unchanged(&self, now: &FileMark) -> bool {
        now.len == self.len && now.modified <= self.modified
    }
}

/// Finds and pins the log file of a run.
#[derive(Debug)]
pub struct LogLocator {
    dir: PathBuf,
    pattern: LogPattern,
    matcher: Option<Regex>,
    dir_ready: bool,
    pinned: Option<PathBuf>,
    baseline: HashMap<PathBuf, FileMark>,
}

impl LogLocator {
    /// Creates a locator over `dir`; glob patterns are compiled here.
    pub fn new(dir: impl Into<PathBuf>, pattern: LogPattern) -> Result<Self, regex::Error> {
        let matcher = match &pattern {
            LogPattern::Fixed(_) => None,
            LogPattern::Glob(glob) => Some(glob_to_regex(glob)?),
        };
        Ok(Self {
            dir: dir.into(),
            pattern,
            matcher,
            dir_ready: false,
            pinned: None,
            baseline: HashMap::new(),
        })
    }

    /// Log directory being searched.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path found by a previous successful [`locate`](Self::locate), if any.
    pub fn pinned(&self) -> Option<&Path> {
        self.pinned.as_deref()
    }

    /// Files the pattern matched when [`record_baseline`](Self::record_baseline) ran.
    pub fn baseline(&self) -> &HashMap<PathBuf, FileMark> {
        &self.baseline
    }

    /// Offset the tailer starts from for `path`: the pre-run size, or 0 for a new file.
    pub fn start_offset(&self, path: &Path) -> u64 {
        self.baseline.get(path).map_or(0, |m| m.len)
    }

    /// Records the files the pattern currently matches.
    ///
    /// Called before the process is spawned. Recorded content is skipped by the
    /// tailer, and in glob mode an untouched recorded file is not a candidate.
    pub async fn record_baseline(&mut self) {
        self.baseline = match self.candidates().await {
            Ok(files) => files
                .into_iter()
                .map(|(path, meta)| (path, FileMark::of(&meta)))
                .collect(),
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "no baseline; log dir unreadable");
                HashMap::new()
            }
        };
    }

    /// Returns the run's log file, or `None` while it does not exist yet.
    pub async fn locate(&mut self) -> Option<PathBuf> {
        if let Some(path) = &self.pinned {
            return Some(path.clone());
        }
        if !self.dir_ready {
            if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
                debug!(dir = %self.dir.display(), error = %e, "log dir not ready");
                return None;
            }
            self.dir_ready = true;
        }

        let found = match &self.pattern {
            LogPattern::Fixed(name) => {
                let path = self.dir.join(name);
                let is_file = tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file());
                is_file.then_some(path)
            }
            LogPattern::Glob(_) => self.newest_fresh_match().await.unwrap_or_else(|e| {
                debug!(dir = %self.dir.display(), error = %e, "log dir scan failed");
                None
            }),
        };

        if let Some(path) = &found {
            info!(path = %path.display(), "log file located");
            self.pinned = found.clone();
        }
        found
    }

    async fn newest_fresh_match(&self) -> io::Result<Option<PathBuf>> {
        let newest = self
            .candidates()
            .await?
            .into_iter()
            .filter_map(|(path, meta)| {
                let mark = FileMark::of(&meta);
                let stale = self.baseline.get(&path).is_some_and(|b| b.unchanged(&mark));
                (!stale).then_some((mark.modified, path))
            })
            .max();
        Ok(newest.map(|(_, path)| path))
    }

    async fn candidates(&self) -> io::Result<Vec<(PathBuf, std::fs::Metadata)>> {
        match &self.pattern {
            LogPattern::Fixed(name) => {
                let path = self.dir.join(name);
                let meta = tokio::fs::metadata(&path).await.ok().filter(|m| m.is_file());
                Ok(meta.map(|m| vec![(path, m)]).unwrap_or_default())
            }
            LogPattern::Glob(_) => {
                let mut out = Vec::new();
                let mut entries = tokio::fs::read_dir(&self.dir).await?;
                while let Some(entry) = entries.next_entry().await? {
                    let name = entry.file_name();
                    let matches = name
                        .to_str()
                        .zip(self.matcher.as_ref())
                        .is_some_and(|(n, re)| re.is_match(n));
                    if !matches {
                        continue;
                    }
                    if let Some(meta) = entry.metadata().await.ok().filter(|m| m.is_file()) {
                        out.push((entry.path(), meta));
                    }
                }
                Ok(out)
            }
        }
    }
}

/// Translates a shell-style file name pattern into an anchored regex.
fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(glob.len() + 8);
    re.push('^');
    for c in glob.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');
    Regex::new(&re)
}
