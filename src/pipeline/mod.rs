//! Pipeline orchestrator: ties fetcher → aggregator → log store together.
//!
//! ## Run
//!
//! `run()` — one collection (cron use):
//!   1. Resolve the window that just closed (hour-aligned in the configured zone)
//!   2. Fetch every departure endpoint concurrently, normalize, aggregate
//!   3. Same for arrival endpoints
//!   4. Append `{range, leave, enter}` to the day's log under the file lock
//!
//! Any fetch or parse failure aborts before step 4, so the log never holds a
//! partial entry. Re-running inside the same hour finds the range already
//! logged and writes nothing.

pub mod aggregate;
pub mod window;

use crate::config::AppConfig;
use crate::error::PaxError;
use crate::models::{AggregatedRecord, Direction, LogEntry, TimeWindow};
use crate::scraper::{OpenDataSource, PaxSource, fetch_all};
use crate::storage::{AppendOutcome, LogKey, LogStore};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use self::aggregate::aggregate;
use self::window::WindowResolver;

pub struct Pipeline {
    config: AppConfig,
    source: Arc<dyn PaxSource>,
    store: LogStore,
    resolver: WindowResolver,
}

impl Pipeline {
    /// Pipeline against the live open-data endpoints.
    pub fn new(config: AppConfig) -> Result<Self> {
        let source = OpenDataSource::new(&config.sources).context("Failed to build source")?;
        Self::with_source(config, Arc::new(source))
    }

    pub fn with_source(config: AppConfig, source: Arc<dyn PaxSource>) -> Result<Self> {
        let resolver = WindowResolver::from_config(&config.window)?;
        let store = LogStore::from_config(&config.storage);
        Ok(Self {
            config,
            source,
            store,
            resolver,
        })
    }

    /// Log file a window is recorded in.
    fn key_for(&self, window: &TimeWindow) -> LogKey {
        LogKey::new(self.resolver.log_date(window))
    }

    fn urls(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::Departure => &self.config.sources.departure,
            Direction::Arrival => &self.config.sources.arrival,
        }
    }

    /// Fetch, normalize and aggregate every endpoint of one direction.
    pub async fn collect_direction(
        &self,
        direction: Direction,
    ) -> Result<Vec<AggregatedRecord>, PaxError> {
        let urls = self.urls(direction);
        info!("Fetching {} {} endpoints", urls.len(), direction);

        let records = fetch_all(Arc::clone(&self.source), urls).await?;
        let raw_count = records.len();
        let aggregated = aggregate(records);

        info!(
            "{}: {} rows → {} groups, {} passengers",
            direction,
            raw_count,
            aggregated.len(),
            aggregated.iter().map(|r| r.count).sum::<u64>()
        );
        Ok(aggregated)
    }

    pub async fn run(&self) -> Result<RunReport, PaxError> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport, PaxError> {
        let window = self.resolver.resolve(now);
        info!("=== Window {} ===", window);

        let departure = self.collect_direction(Direction::Departure).await?;
        let arrival = self.collect_direction(Direction::Arrival).await?;

        let entry = LogEntry {
            window,
            departure,
            arrival,
        };
        let departure_total = entry.total(Direction::Departure);
        let arrival_total = entry.total(Direction::Arrival);
        let departure_groups = entry.departure.len();
        let arrival_groups = entry.arrival.len();

        let key = self.key_for(&window);
        let store = self.store.clone();
        let outcome = tokio::task::spawn_blocking(move || store.append(&key, entry)).await??;

        Ok(RunReport {
            window,
            departure_groups,
            arrival_groups,
            departure_total,
            arrival_total,
            outcome,
        })
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub window: TimeWindow,
    pub departure_groups: usize,
    pub arrival_groups: usize,
    pub departure_total: u64,
    pub arrival_total: u64,
    pub outcome: AppendOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::stub::{Reply, StubSource, row};
    use crate::storage::read_entries;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.sources.departure = vec!["https://stub/TPE5".into(), "https://stub/KHH5".into()];
        cfg.sources.arrival = vec!["https://stub/TPE1".into()];
        cfg.storage.logs_dir = dir.path().to_path_buf();
        cfg.storage.lock_timeout_ms = 200;
        cfg
    }

    fn healthy() -> StubSource {
        StubSource::default()
            .with(
                "https://stub/TPE5",
                Reply::Rows(vec![
                    row(Some("5"), "USA", "20~29"),
                    row(None, "JPN", "30~39"),
                ]),
            )
            .with("https://stub/KHH5", Reply::Rows(vec![row(Some("3"), "USA", "20~29")]))
            .with(
                "https://stub/TPE1",
                Reply::Rows(vec![row(Some("2"), "KOR", "40~49")]),
            )
    }

    // 2024-01-01 03:15 in Taipei
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 12, 31, 19, 15, 0).unwrap()
    }

    #[tokio::test]
    async fn test_run_appends_entry() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::with_source(config(&dir), Arc::new(healthy())).unwrap();

        let report = pipeline.run_at(now()).await.unwrap();

        assert_eq!(report.departure_total, 8);
        assert_eq!(report.arrival_total, 2);
        assert_eq!(report.departure_groups, 1);
        let path = dir.path().join("2024").join("2024-01-01.json");
        assert_eq!(
            report.outcome,
            AppendOutcome::Appended {
                path: path.clone(),
                entries: 1
            }
        );

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].window.canonical(),
            ["2023-12-31T16:00:00.000Z".to_string(), "2023-12-31T19:00:00.000Z".to_string()]
        );
        assert_eq!(entries[0].departure[0].count, 8);
        assert_eq!(entries[0].arrival[0].nationality, "KOR");
    }

    #[tokio::test]
    async fn test_rerun_same_hour_is_already_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::with_source(config(&dir), Arc::new(healthy())).unwrap();

        pipeline.run_at(now()).await.unwrap();
        let again = pipeline
            .run_at(now() + chrono::TimeDelta::minutes(30))
            .await
            .unwrap();

        assert!(matches!(again.outcome, AppendOutcome::AlreadyRecorded { .. }));
        let path = dir.path().join("2024").join("2024-01-01.json");
        assert_eq!(read_entries(&path).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zone_change_does_not_duplicate_a_window() {
        let dir = tempfile::tempdir().unwrap();
        let taipei = Pipeline::with_source(config(&dir), Arc::new(healthy())).unwrap();
        taipei.run_at(now()).await.unwrap();

        let mut utc_config = config(&dir);
        utc_config.window.timezone = "UTC".into();
        let utc = Pipeline::with_source(utc_config, Arc::new(healthy())).unwrap();
        let again = utc.run_at(now()).await.unwrap();

        assert_eq!(
            again.outcome,
            AppendOutcome::AlreadyRecorded {
                path: dir.path().join("2024").join("2024-01-01.json")
            }
        );
        assert!(!dir.path().join("2023").join("2023-12-31.json").exists());
    }

    #[tokio::test]
    async fn test_any_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = healthy().with("https://stub/TPE1", Reply::Status(500));
        let pipeline = Pipeline::with_source(config(&dir), Arc::new(source)).unwrap();

        let err = pipeline.run_at(now()).await.unwrap_err();

        assert!(matches!(err, PaxError::Status { ref url, .. } if url == "https://stub/TPE1"));
        assert!(!dir.path().join("2024").exists());
    }

    #[tokio::test]
    async fn test_bad_count_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = healthy().with(
            "https://stub/KHH5",
            Reply::Rows(vec![row(Some("lots"), "USA", "20~29")]),
        );
        let pipeline = Pipeline::with_source(config(&dir), Arc::new(source)).unwrap();

        let err = pipeline.run_at(now()).await.unwrap_err();
        assert!(matches!(err, PaxError::Count { .. }));
        assert!(!dir.path().join("2024").exists());
    }

    #[tokio::test]
    async fn test_collect_direction_only_hits_that_direction() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(healthy());
        let pipeline = Pipeline::with_source(config(&dir), source.clone()).unwrap();

        let arrival = pipeline.collect_direction(Direction::Arrival).await.unwrap();
        assert_eq!(arrival.len(), 1);
        assert_eq!(source.calls(), 1);
    }
}
