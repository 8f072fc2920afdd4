//! Append-only JSON log store.
//!
//! ## Layout
//!
//! `<root>/<YYYY>/<YYYY-MM-DD>.json`, each file a JSON array of [`LogEntry`].
//! The date is the local calendar date of the window's end, so a given window
//! always maps to the same file while the zone stays the same. The files for
//! the day before and after are consulted too: a zone change moves a window's
//! end date by at most one day, and it must still be found.
//!
//! ## Write path
//!
//! lock → read → check → write temp file → fsync → rename over target → unlock.
//! Readers never see a half-written file and a crash leaves the previous
//! contents intact. Re-appending a window already present is a no-op.

pub mod lock;

use crate::config::StorageConfig;
use crate::error::PaxError;
use crate::models::{LogEntry, TimeWindow};
use chrono::{Datelike, NaiveDate};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use self::lock::LockGuard;

/// Identifies one log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogKey {
    pub date: NaiveDate,
}

impl LogKey {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Keys for the previous and next calendar day.
    pub fn neighbours(&self) -> impl Iterator<Item = LogKey> {
        [self.date.pred_opt(), self.date.succ_opt()]
            .into_iter()
            .flatten()
            .map(LogKey::new)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended { path: PathBuf, entries: usize },
    /// The window was already logged in `path`; nothing was written.
    AlreadyRecorded { path: PathBuf },
}

// ── Free helpers ──────────────────────────────────────────────────────────────

/// Read a log file. A missing file is an empty log.
pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>, PaxError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(PaxError::LogRead {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_slice(&bytes).map_err(|source| PaxError::LogCorrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Exact match on both range endpoints.
pub fn contains(entries: &[LogEntry], window: &TimeWindow) -> bool {
    entries.iter().any(|e| e.window.same_as(window))
}

fn write_atomic(path: &Path, entries: &[LogEntry]) -> Result<(), PaxError> {
    let err = |source: std::io::Error| PaxError::LogWrite {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(err)?;
    serde_json::to_writer(&mut tmp, entries).map_err(|e| err(e.into()))?;
    tmp.flush().map_err(err)?;
    tmp.as_file().sync_all().map_err(err)?;
    tmp.persist(path).map_err(|e| err(e.error))?;
    Ok(())
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LogStore {
    root: PathBuf,
    lock_timeout: Duration,
}

impl LogStore {
    pub fn new(root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            lock_timeout,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.logs_dir.clone(), config.lock_timeout())
    }

    pub fn path_for(&self, key: &LogKey) -> PathBuf {
        self.root
            .join(key.year().to_string())
            .join(format!("{}.json", key.date.format("%Y-%m-%d")))
    }

    /// Lock the file for `key` and load its entries.
    ///
    /// The lock is held until the returned handle is dropped or consumed.
    pub fn open(&self, key: &LogKey) -> Result<LogHandle, PaxError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PaxError::LogWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let lock = LockGuard::acquire(&path, self.lock_timeout)?;
        let entries = read_entries(&path)?;
        debug!("Opened {:?} ({} entries)", path, entries.len());

        let mut neighbours = Vec::new();
        for other in key.neighbours() {
            let other_path = self.path_for(&other);
            let windows = read_entries(&other_path)?
                .into_iter()
                .map(|e| e.window)
                .collect::<Vec<_>>();
            if !windows.is_empty() {
                neighbours.push((other_path, windows));
            }
        }

        Ok(LogHandle {
            path,
            entries,
            neighbours,
            _lock: lock,
        })
    }

    /// `open` + `LogHandle::append` in one critical section.
    pub fn append(&self, key: &LogKey, entry: LogEntry) -> Result<AppendOutcome, PaxError> {
        self.open(key)?.append(entry)
    }
}

/// A locked, loaded log file.
#[derive(Debug)]
pub struct LogHandle {
    path: PathBuf,
    entries: Vec<LogEntry>,
    /// Windows already filed under the adjacent days.
    neighbours: Vec<(PathBuf, Vec<TimeWindow>)>,
    _lock: LockGuard,
}

impl LogHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn contains(&self, window: &TimeWindow) -> bool {
        self.recorded_in(window).is_some()
    }

    /// File already holding `window`: this one or an adjacent day's.
    fn recorded_in(&self, window: &TimeWindow) -> Option<&Path> {
        if contains(&self.entries, window) {
            return Some(&self.path);
        }
        self.neighbours
            .iter()
            .find(|(_, windows)| windows.iter().any(|w| w.same_as(window)))
            .map(|(path, _)| path.as_path())
    }

    /// Append `entry` unless its window is already logged. Consumes the handle,
    /// so the lock is released on every path out of here.
    pub fn append(mut self, entry: LogEntry) -> Result<AppendOutcome, PaxError> {
        if let Some(path) = self.recorded_in(&entry.window) {
            info!("Range already exists: {} in {:?}", entry.window, path);
            return Ok(AppendOutcome::AlreadyRecorded {
                path: path.to_path_buf(),
            });
        }

        self.entries.push(entry);
        write_atomic(&self.path, &self.entries)?;
        info!("Appended entry #{} to {:?}", self.entries.len(), self.path);

        Ok(AppendOutcome::Appended {
            entries: self.entries.len(),
            path: self.path,
        })
    }
}
