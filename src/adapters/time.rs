//! ESP32 time adapter.
//!
//! Provides the [`ClockPort`] for the fire pump controller.
//!
//! - Monotonic time: `esp_timer_get_time()` on **`target_os = "espidf"`**,
//!   `std::time::Instant` on host for testing and simulation.
//! - Local wall-clock time: there is no RTC battery or NTP on the pump
//!   panel, so wall time comes from the cellular network (`AT+CCLK?`).
//!   The adapter stores the network time together with the monotonic
//!   instant it was taken and extrapolates from there. Until the first
//!   sync, local time is unknown.

use chrono::{NaiveDateTime, TimeDelta};
use log::info;

use crate::app::ports::ClockPort;

/// Network time pinned to a monotonic instant.
#[derive(Debug, Clone, Copy)]
struct WallClockBase {
    at: NaiveDateTime,
    mono_ms: u64,
}

/// Time adapter for the ESP32-S3 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    base: Option<WallClockBase>,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            base: None,
        }
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Record local wall time as reported by the network.
    pub fn sync_wall_clock(&mut self, now: NaiveDateTime) {
        let mono_ms = self.uptime_ms();
        self.sync_wall_clock_at(now, mono_ms);
    }

    /// Record local wall time observed at monotonic instant `mono_ms`.
    pub fn sync_wall_clock_at(&mut self, now: NaiveDateTime, mono_ms: u64) {
        if self.base.is_none() {
            info!("Clock: wall time synced to {}", now);
        }
        self.base = Some(WallClockBase { at: now, mono_ms });
    }

    pub fn is_synced(&self) -> bool {
        self.base.is_some()
    }

    /// Wall time at monotonic instant `mono_ms`, if synced.
    pub fn local_time_at(&self, mono_ms: u64) -> Option<NaiveDateTime> {
        let base = self.base?;
        let elapsed = mono_ms.saturating_sub(base.mono_ms);
        let delta = TimeDelta::try_milliseconds(i64::try_from(elapsed).ok()?)?;
        base.at.checked_add_signed(delta)
    }
}

impl ClockPort for Esp32TimeAdapter {
    fn now_ms(&self) -> u64 {
        self.uptime_ms()
    }

    fn local_time(&self) -> Option<NaiveDateTime> {
        self.local_time_at(self.uptime_ms())
    }
}
