//! Control-loop watchdog.
//!
//! The ESP-IDF task watchdog reboots the board if the control task stops
//! feeding it. A reboot releases both relays, so a running engine stops:
//! the loop feeds at every stage boundary, never only once per iteration.
//!
//! ```text
//!   modem poll + CSQ/CCLK ─feed─▶ each command ─feed─▶ tick ─feed─▶ each SMS ─feed─▶
//! ```
//!
//! Each modem exchange carries its own deadline. The assertions below keep
//! the longest of them well inside the timeout.

use core::cell::Cell;

use log::{info, warn};

use crate::adapters::modem::{COMMAND_TIMEOUT_MS, POLL_BUDGET_MS, SEND_TIMEOUT_MS};

/// Stall time before the watchdog panics and reboots.
pub const WATCHDOG_TIMEOUT_MS: u32 = 30_000;

/// Feed gaps longer than this are logged.
pub const SLOW_STAGE_MS: u64 = WATCHDOG_TIMEOUT_MS as u64 / 2;

// Poll, signal query and clock query run back to back before one feed.
const _: () = assert!(POLL_BUDGET_MS + 2 * COMMAND_TIMEOUT_MS < WATCHDOG_TIMEOUT_MS / 2);
const _: () = assert!(SEND_TIMEOUT_MS < WATCHDOG_TIMEOUT_MS / 2);

/// The loop stage that just finished when the watchdog is fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Inbound poll plus the signal and clock queries.
    Modem,
    /// One inbound command dispatched.
    Command,
    /// Control tick.
    Tick,
    /// One outbound SMS attempted.
    Sms,
}

impl Stage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Modem => "modem",
            Self::Command => "command",
            Self::Tick => "tick",
            Self::Sms => "sms",
        }
    }
}

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    boot: std::time::Instant,
    last_feed_ms: Cell<u64>,
    longest_gap_ms: Cell<u64>,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Arm the task watchdog for the calling task.
    pub fn new() -> Self {
        let wd = Self {
            #[cfg(target_os = "espidf")]
            subscribed: subscribe_current_task(),
            #[cfg(not(target_os = "espidf"))]
            boot: std::time::Instant::now(),
            last_feed_ms: Cell::new(0),
            longest_gap_ms: Cell::new(0),
        };
        wd.last_feed_ms.set(wd.now_ms());
        wd
    }

    /// Record the end of `stage` and reset the hardware timer.
    pub fn feed(&self, stage: Stage) {
        self.record(stage, self.now_ms());

        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the calling task's TWDT entry.
            unsafe {
                esp_idf_svc::sys::esp_task_wdt_reset();
            }
        }
    }

    /// Longest time between two feeds since boot.
    pub fn longest_gap_ms(&self) -> u64 {
        self.longest_gap_ms.get()
    }

    fn record(&self, stage: Stage, now_ms: u64) {
        let gap = now_ms.saturating_sub(self.last_feed_ms.get());
        if gap > SLOW_STAGE_MS {
            warn!(
                "Watchdog: {} stage took {} ms (limit {} ms)",
                stage.label(),
                gap,
                WATCHDOG_TIMEOUT_MS
            );
        }
        if gap > self.longest_gap_ms.get() {
            self.longest_gap_ms.set(gap);
        }
        self.last_feed_ms.set(now_ms);
    }

    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }
}

#[cfg(target_os = "espidf")]
fn subscribe_current_task() -> bool {
    use esp_idf_svc::sys::{
        ESP_OK, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure,
    };

    let cfg = esp_task_wdt_config_t {
        timeout_ms: WATCHDOG_TIMEOUT_MS,
        idle_core_mask: 0,
        trigger_panic: true,
    };
    // SAFETY: called once from the main task during boot.
    let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
    if ret != ESP_OK {
        warn!("Watchdog: reconfigure returned {}", ret);
    }

    // SAFETY: a null handle subscribes the calling task.
    let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
    if ret == ESP_OK {
        info!("Watchdog: armed, {} s to reboot", WATCHDOG_TIMEOUT_MS / 1000);
        true
    } else {
        warn!("Watchdog: subscribe failed ({}), running unguarded", ret);
        false
    }
}
