use std::path::PathBuf;

use reqwest::StatusCode;
use tokio::task::JoinError;

/// Everything that can abort a collection run.
///
/// A run is all-or-nothing: any of these stops it before the log is touched,
/// or leaves the previous log contents in place if raised while writing.
#[derive(thiserror::Error, Debug)]
pub enum PaxError {
    // ── Fetch ─────────────────────────────────────────────────────────────────
    /// Transport-level failure talking to an endpoint.
    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Endpoint answered with a non-success status.
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: StatusCode },

    // ── Parse ─────────────────────────────────────────────────────────────────
    /// Body was not a JSON array of passenger rows.
    #[error("unexpected response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// `paxCnt` survived the null filter but is not a non-negative integer.
    #[error("non-numeric paxCnt {value:?} from {url}")]
    Count { url: String, value: String },

    // ── Log store ─────────────────────────────────────────────────────────────
    #[error("could not read log {path:?}: {source}")]
    LogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log {path:?} is not a valid entry list: {source}")]
    LogCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not write log {path:?}: {source}")]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out waiting for lock {path:?} (another run in progress, or a stale lock)")]
    LockTimeout { path: PathBuf },

    /// A fetch task panicked or was cancelled by the runtime.
    #[error("fetch task failed: {0}")]
    Task(#[from] JoinError),
}
