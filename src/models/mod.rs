use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ── Direction ─────────────────────────────────────────────────────────────────

/// Traffic direction; each one is aggregated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Direction {
    /// Leaving the country ("leave" in the log).
    Departure,
    /// Entering the country ("enter" in the log).
    Arrival,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Departure => f.write_str("departure"),
            Direction::Arrival => f.write_str("arrival"),
        }
    }
}

// ── Raw endpoint row ──────────────────────────────────────────────────────────

/// One row as served by an open-data endpoint. Any field may be null or absent.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawPaxRow {
    #[serde(rename = "paxCnt", default)]
    pub pax_cnt: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(rename = "age", default)]
    pub age: Option<String>,
}

// ── Passenger records ─────────────────────────────────────────────────────────

/// A complete, normalized row. Lives only for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassengerRecord {
    pub count: u64,
    pub nationality: String,
    pub age_bracket: String,
}

/// Sum of all records sharing one (nationality, age bracket) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct AggregatedRecord {
    pub count: u64,
    pub nationality: String,
    #[serde(rename = "age")]
    pub age_bracket: String,
}

// ── Time window ───────────────────────────────────────────────────────────────

/// Half-open interval `[start, end)`; persisted as a two-element array of
/// ISO-8601 strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// `2024-01-01T00:00:00.000Z`
pub fn canonical_instant(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `[start, end]` strings used for identity and persistence.
    pub fn canonical(&self) -> [String; 2] {
        [canonical_instant(&self.start), canonical_instant(&self.end)]
    }

    /// Same window iff both canonical endpoints match exactly. Overlap does not count.
    pub fn same_as(&self, other: &TimeWindow) -> bool {
        self.canonical() == other.canonical()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [start, end] = self.canonical();
        write!(f, "[{start}, {end})")
    }
}

impl Serialize for TimeWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.canonical().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [start, end] = <[String; 2]>::deserialize(deserializer)?;
        let parse = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    <D::Error as serde::de::Error>::custom(format!("bad range instant {s:?}: {e}"))
                })
        };
        Ok(Self {
            start: parse(&start)?,
            end: parse(&end)?,
        })
    }
}

// ── Log entry ─────────────────────────────────────────────────────────────────

/// One persisted window. Created once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    #[serde(rename = "range")]
    pub window: TimeWindow,
    #[serde(rename = "leave")]
    pub departure: Vec<AggregatedRecord>,
    #[serde(rename = "enter")]
    pub arrival: Vec<AggregatedRecord>,
}

impl LogEntry {
    pub fn total(&self, direction: Direction) -> u64 {
        let records = match direction {
            Direction::Departure => &self.departure,
            Direction::Arrival => &self.arrival,
        };
        records.iter().map(|r| r.count).sum()
    }
}
