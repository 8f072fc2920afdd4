//! Loader for the whole log corpus: every day file under every year directory.

use crate::models::LogEntry;
use crate::storage::read_entries;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// All `*.json` logs one level below `root`'s year directories, sorted by path.
pub fn discover_log_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Ok(vec![]);
    }

    let mut files = Vec::new();
    for year_dir in std::fs::read_dir(root).with_context(|| format!("Listing {:?}", root))? {
        let year_dir = year_dir?.path();
        if !year_dir.is_dir() {
            continue;
        }
        for entry in std::fs::read_dir(&year_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Concatenated entries of every log file, in file order.
pub fn load_corpus(root: &Path) -> Result<Corpus> {
    let files = discover_log_files(root)?;
    let mut entries = Vec::new();

    for path in &files {
        let loaded = read_entries(path)?;
        debug!("{:?}: {} entries", path, loaded.len());
        entries.extend(loaded);
    }

    Ok(Corpus { files, entries })
}

#[derive(Debug, Default)]
pub struct Corpus {
    pub files: Vec<PathBuf>,
    pub entries: Vec<LogEntry>,
}

impl Corpus {
    /// Ranges that occur more than once across the corpus, with their counts.
    pub fn duplicate_ranges(&self) -> Vec<([String; 2], usize)> {
        let mut seen: HashMap<[String; 2], usize> = HashMap::new();
        for entry in &self.entries {
            *seen.entry(entry.window.canonical()).or_default() += 1;
        }

        let mut dups: Vec<_> = seen.into_iter().filter(|(_, n)| *n > 1).collect();
        dups.sort();
        dups
    }

    /// Earliest start and latest end over all entries.
    pub fn span(&self) -> Option<(String, String)> {
        let first = self.entries.iter().map(|e| e.window.start).min()?;
        let last = self.entries.iter().map(|e| e.window.end).max()?;
        Some((
            crate::models::canonical_instant(&first),
            crate::models::canonical_instant(&last),
        ))
    }
}
