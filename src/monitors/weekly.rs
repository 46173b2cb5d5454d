//! Weekly status report scheduler.
//!
//! Fires when the local wall clock is inside the configured weekday/hour
//! window and more than an hour has passed since the last report. The
//! last report time is durable so a reboot inside the window does not
//! send a second report.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeDelta, Timelike, Weekday};
use log::warn;

use crate::app::ports::{StorageError, StoragePort};
use crate::runtime::COUNTER_NAMESPACE;

/// NVS key for the last weekly report time.
pub const WEEKLY_KEY: &str = "weekly";

#[derive(Debug, Clone)]
pub struct WeeklyReportScheduler {
    day: Weekday,
    hour: u8,
    last_report: Option<NaiveDateTime>,
}

impl WeeklyReportScheduler {
    pub fn new(day: Weekday, hour: u8) -> Self {
        Self {
            day,
            hour,
            last_report: None,
        }
    }

    /// Seed the last report time (from storage).
    pub fn restore(&mut self, last: Option<NaiveDateTime>) {
        self.last_report = last;
    }

    /// Returns `true` when a report is due at `now`, recording `now` as
    /// the last report time.
    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        if now.weekday() != self.day || now.hour() != u32::from(self.hour) {
            return false;
        }
        let stale = self
            .last_report
            .is_none_or(|last| now - last > TimeDelta::hours(1));
        if stale {
            self.last_report = Some(now);
        }
        stale
    }

    pub fn last_report(&self) -> Option<NaiveDateTime> {
        self.last_report
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Load the last report time. Missing or corrupt values read as `None`.
pub fn load_last_report(store: &impl StoragePort) -> Option<NaiveDateTime> {
    let mut buf = [0u8; 16];
    match store.read(COUNTER_NAMESPACE, WEEKLY_KEY, &mut buf) {
        Ok(len) => postcard::from_bytes::<i64>(&buf[..len])
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.naive_utc()),
        Err(StorageError::NotFound) => None,
        Err(e) => {
            warn!("Weekly report stamp unreadable: {e}");
            None
        }
    }
}

/// Store the last report time as seconds on the local-time axis.
pub fn save_last_report(store: &mut impl StoragePort, at: NaiveDateTime) -> Result<(), StorageError> {
    let bytes =
        postcard::to_allocvec(&at.and_utc().timestamp()).map_err(|_| StorageError::Corrupted)?;
    store.write(COUNTER_NAMESPACE, WEEKLY_KEY, &bytes)
}
