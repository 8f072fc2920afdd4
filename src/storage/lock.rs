use crate::error::PaxError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive advisory lock on one log file, taken on a sibling `<file>.lock`.
///
/// The lock file itself is left in place; only the OS lock on it matters, and
/// the OS drops that when the holder exits, cleanly or not.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    file: File,
}

impl LockGuard {
    pub fn lock_path(target: &Path) -> PathBuf {
        let mut name = target.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        target.with_file_name(name)
    }

    /// Block until the lock for `target` is ours or `timeout` elapses.
    pub fn acquire(target: &Path, timeout: Duration) -> Result<Self, PaxError> {
        let path = Self::lock_path(target);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| PaxError::LogWrite {
                path: path.clone(),
                source,
            })?;
        let deadline = Instant::now() + timeout;

        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    debug!("Locked {:?}", path);
                    return Ok(Self { path, file });
                }
                Err(e) if is_contended(&e) => {
                    if Instant::now() >= deadline {
                        return Err(PaxError::LockTimeout { path });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => return Err(PaxError::LogWrite { path, source }),
            }
        }
    }
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Could not release lock {:?}: {}", self.path, e);
        }
    }
}
