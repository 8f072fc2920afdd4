//! Window resolution: "now" → the last complete fixed-width window, aligned
//! to whole hours in the configured zone.

use crate::config::WindowConfig;
use crate::models::TimeWindow;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy)]
pub struct WindowResolver {
    tz: Tz,
    width: TimeDelta,
}

impl WindowResolver {
    pub fn new(tz: Tz, width_hours: u32) -> Self {
        Self {
            tz,
            width: TimeDelta::hours(i64::from(width_hours)),
        }
    }

    pub fn from_config(config: &WindowConfig) -> Result<Self> {
        Ok(Self::new(config.tz()?, config.width_hours))
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// `end` = `now` floored to the local hour, `start` = `end - width`.
    pub fn resolve(&self, now: DateTime<Utc>) -> TimeWindow {
        let local = now.with_timezone(&self.tz);
        let past_hour = TimeDelta::seconds(i64::from(local.minute() * 60 + local.second()))
            + TimeDelta::nanoseconds(i64::from(local.nanosecond()));
        let end = now - past_hour;
        TimeWindow::new(end - self.width, end)
    }

    pub fn current(&self) -> TimeWindow {
        self.resolve(Utc::now())
    }

    /// Calendar date of the window's end in the configured zone; names the log file.
    pub fn log_date(&self, window: &TimeWindow) -> NaiveDate {
        window.end.with_timezone(&self.tz).date_naive()
    }
}
