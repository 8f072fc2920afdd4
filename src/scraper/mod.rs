pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::SourceConfig;
use crate::error::PaxError;
use crate::models::{PassengerRecord, RawPaxRow};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

use self::cleaner::normalize_rows;
use self::http_client::HttpClient;
use self::parsers::parse_pax_rows;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable passenger-count source.
#[async_trait]
pub trait PaxSource: Send + Sync {
    /// One GET against `url`, decoded into raw rows.
    async fn fetch_rows(&self, url: &str) -> Result<Vec<RawPaxRow>, PaxError>;
}

// ── Immigration open-data API ─────────────────────────────────────────────────

pub struct OpenDataSource {
    client: HttpClient,
}

impl OpenDataSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
        })
    }
}

#[async_trait]
impl PaxSource for OpenDataSource {
    async fn fetch_rows(&self, url: &str) -> Result<Vec<RawPaxRow>, PaxError> {
        let body = self.client.get_text(url).await?;
        let rows = parse_pax_rows(url, &body)?;
        debug!("{}: {} rows", url, rows.len());
        Ok(rows)
    }
}

// ── Fan-out ───────────────────────────────────────────────────────────────────

/// Fetch and normalize every URL concurrently, then flatten in URL order.
///
/// All-or-nothing: the first failure is returned and the remaining tasks are
/// aborted when the set is dropped, so no partial result escapes.
pub async fn fetch_all(
    source: Arc<dyn PaxSource>,
    urls: &[String],
) -> Result<Vec<PassengerRecord>, PaxError> {
    let mut tasks = JoinSet::new();

    for (idx, url) in urls.iter().enumerate() {
        let source = Arc::clone(&source);
        let url = url.clone();
        tasks.spawn(async move {
            let rows = source.fetch_rows(&url).await?;
            let records = normalize_rows(&url, rows)?;
            Ok::<_, PaxError>((idx, records))
        });
    }

    let mut batches: Vec<Vec<PassengerRecord>> = vec![Vec::new(); urls.len()];
    while let Some(joined) = tasks.join_next().await {
        let (idx, records) = joined??;
        batches[idx] = records;
    }

    Ok(batches.into_iter().flatten().collect())
}

// ── Test double ───────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod stub {
    use super::*;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    pub enum Reply {
        Rows(Vec<RawPaxRow>),
        Status(u16),
        Body(&'static str),
    }

    /// In-memory source keyed by URL. Unknown URLs answer 404.
    #[derive(Default)]
    pub struct StubSource {
        replies: HashMap<String, Reply>,
        pub calls: AtomicUsize,
    }

    impl StubSource {
        pub fn with(mut self, url: &str, reply: Reply) -> Self {
            self.replies.insert(url.to_string(), reply);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    pub fn row(cnt: Option<&str>, nat: &str, age: &str) -> RawPaxRow {
        RawPaxRow {
            pax_cnt: cnt.map(str::to_string),
            nationality: Some(nat.to_string()),
            age: Some(age.to_string()),
        }
    }

    #[async_trait]
    impl PaxSource for StubSource {
        async fn fetch_rows(&self, url: &str) -> Result<Vec<RawPaxRow>, PaxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(url).cloned().unwrap_or(Reply::Status(404)) {
                Reply::Rows(rows) => Ok(rows),
                Reply::Status(code) => Err(PaxError::Status {
                    url: url.to_string(),
                    status: StatusCode::from_u16(code).unwrap(),
                }),
                Reply::Body(body) => parse_pax_rows(url, body),
            }
        }
    }
}
