use anyhow::{Context, Result, bail, ensure};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sources: SourceConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Open-data endpoints and HTTP client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_departure_urls")]
    pub departure: Vec<String>,

    #[serde(default = "default_arrival_urls")]
    pub arrival: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Aggregation window settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowConfig {
    /// IANA zone name used to align windows and name log files.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_width_hours")]
    pub width_hours: u32,
}

/// Log store settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

const OPENDATA_BASE: &str = "https://opendata.immigration.gov.tw/APIS";
const CHECKPOINTS: [&str; 10] = [
    "CYI", "HUN", "KHH", "MZG", "PIF", "RMQ", "TNN", "TPE", "TSA", "TTT",
];

fn checkpoint_urls(suffix: char) -> Vec<String> {
    CHECKPOINTS
        .iter()
        .map(|code| format!("{OPENDATA_BASE}/{code}{suffix}"))
        .collect()
}

fn default_departure_urls() -> Vec<String> {
    checkpoint_urls('5')
}
fn default_arrival_urls() -> Vec<String> {
    checkpoint_urls('1')
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "paxlog/0.1 (border checkpoint passenger statistics)".to_string()
}
fn default_timezone() -> String {
    "Asia/Taipei".to_string()
}
fn default_width_hours() -> u32 {
    3
}
fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn default_lock_timeout_ms() -> u64 {
    10_000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            departure: default_departure_urls(),
            arrival: default_arrival_urls(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            width_hours: default_width_hours(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            logs_dir: default_logs_dir(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: SourceConfig::default(),
            window: WindowConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("PAXLOG").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        app_cfg.validate()?;
        Ok(app_cfg)
    }

    /// Reject settings that would make every run fail or produce bogus windows.
    pub fn validate(&self) -> Result<()> {
        self.window.tz()?;
        ensure!(self.window.width_hours > 0, "window.width_hours must be at least 1");

        for (name, urls) in [
            ("sources.departure", &self.sources.departure),
            ("sources.arrival", &self.sources.arrival),
        ] {
            ensure!(!urls.is_empty(), "{name} lists no endpoints");
            for raw in urls {
                let parsed = url::Url::parse(raw)
                    .with_context(|| format!("{name}: invalid endpoint URL {raw:?}"))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    bail!("{name}: endpoint {raw:?} is not http(s)");
                }
            }
        }
        Ok(())
    }
}

impl WindowConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("window.timezone {:?}: {}", self.timezone, e))
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StorageConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.sources.departure.len(), 10);
        assert_eq!(cfg.sources.arrival.len(), 10);
        assert_eq!(
            cfg.sources.departure[0],
            "https://opendata.immigration.gov.tw/APIS/CYI5"
        );
        assert_eq!(
            cfg.sources.arrival[9],
            "https://opendata.immigration.gov.tw/APIS/TTT1"
        );
        assert_eq!(cfg.window.tz().unwrap(), chrono_tz::Asia::Taipei);
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let mut cfg = AppConfig::default();
        cfg.window.timezone = "Mars/Olympus_Mons".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_width() {
        let mut cfg = AppConfig::default();
        cfg.window.width_hours = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        let mut cfg = AppConfig::default();
        cfg.sources.arrival = vec!["not a url".into()];
        assert!(cfg.validate().is_err());

        cfg.sources.arrival = vec!["ftp://example.org/feed".into()];
        assert!(cfg.validate().is_err());

        cfg.sources.arrival = vec![];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[storage]\nlogs_dir = \"/tmp/pax\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.storage.logs_dir, PathBuf::from("/tmp/pax"));
        assert_eq!(cfg.storage.lock_timeout_ms, 10_000);
        assert_eq!(cfg.window.width_hours, 3);
        assert_eq!(cfg.sources.departure.len(), 10);
    }
}
