//! Engine run-time accounting.
//!
//! The durable total lives in NVS; the running session is only in RAM.
//!
//! ```text
//!   true runtime = cumulative_run_secs + (now - session_start)
//! ```
//!
//! Settling moves whole elapsed seconds from the session into the durable
//! total and advances `session_start` by exactly that amount, so the
//! sub-second remainder is neither lost nor counted twice.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};

/// NVS namespace for run-time counters.
pub const COUNTER_NAMESPACE: &str = "firepump";
/// NVS key for [`PersistedCounters`].
pub const COUNTER_KEY: &str = "counters";

// ---------------------------------------------------------------------------
// Persisted form
// ---------------------------------------------------------------------------

/// The durable part of the run-time counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCounters {
    pub cumulative_run_secs: u64,
    pub last_service_milestone_secs: u64,
}

/// Typed counter persistence, layered over any [`StoragePort`].
pub trait CounterStore {
    /// `Ok(None)` when nothing has been stored yet.
    fn load_counters(&self) -> Result<Option<PersistedCounters>, StorageError>;

    fn save_counters(&mut self, counters: &PersistedCounters) -> Result<(), StorageError>;
}

impl<T: StoragePort + ?Sized> CounterStore for T {
    fn load_counters(&self) -> Result<Option<PersistedCounters>, StorageError> {
        let mut buf = [0u8; 32];
        match self.read(COUNTER_NAMESPACE, COUNTER_KEY, &mut buf) {
            Ok(len) => postcard::from_bytes(&buf[..len])
                .map(Some)
                .map_err(|_| StorageError::Corrupted),
            Err(StorageError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save_counters(&mut self, counters: &PersistedCounters) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(counters).map_err(|_| StorageError::Corrupted)?;
        self.write(COUNTER_NAMESPACE, COUNTER_KEY, &bytes)
    }
}

// ---------------------------------------------------------------------------
// Runtime counter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RuntimeCounter {
    cumulative_run_secs: u64,
    last_service_milestone_secs: u64,
    /// Monotonic ms at which the unsettled part of the session began.
    session_start_ms: Option<u64>,
}

impl RuntimeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the durable counters. Missing or unreadable storage means a
    /// fresh start at zero.
    pub fn restore(&mut self, store: &impl CounterStore) {
        match store.load_counters() {
            Ok(Some(c)) => {
                self.cumulative_run_secs = c.cumulative_run_secs;
                self.last_service_milestone_secs = c.last_service_milestone_secs;
                info!(
                    "Runtime restored: {}s total, last service milestone {}s",
                    c.cumulative_run_secs, c.last_service_milestone_secs
                );
            }
            Ok(None) => info!("No stored runtime counters, starting at zero"),
            Err(e) => warn!("Runtime counters unreadable ({e}), starting at zero"),
        }
    }

    /// Write the durable counters. Failures are logged and returned.
    pub fn persist(&self, store: &mut impl CounterStore) -> Result<(), StorageError> {
        store.save_counters(&self.snapshot()).inspect_err(|e| {
            warn!("Failed to persist runtime counters: {e}");
        })
    }

    pub fn snapshot(&self) -> PersistedCounters {
        PersistedCounters {
            cumulative_run_secs: self.cumulative_run_secs,
            last_service_milestone_secs: self.last_service_milestone_secs,
        }
    }

    // ── Sessions ──────────────────────────────────────────────────

    /// Open a session at `now_ms`. An already open session is settled first.
    pub fn begin_session(&mut self, now_ms: u64) {
        if self.session_start_ms.is_some() {
            self.settle(now_ms);
        }
        self.session_start_ms = Some(now_ms);
    }

    pub fn session_active(&self) -> bool {
        self.session_start_ms.is_some()
    }

    /// Whole seconds accumulated in the open session.
    pub fn session_elapsed_secs(&self, now_ms: u64) -> u64 {
        self.session_start_ms
            .map_or(0, |start| now_ms.saturating_sub(start) / 1000)
    }

    /// Durable total plus the open session.
    pub fn provisional_total_secs(&self, now_ms: u64) -> u64 {
        self.cumulative_run_secs + self.session_elapsed_secs(now_ms)
    }

    /// Move whole elapsed seconds into the durable total, keeping the
    /// session open. Returns the seconds moved.
    pub fn settle(&mut self, now_ms: u64) -> u64 {
        let Some(start) = self.session_start_ms else {
            return 0;
        };
        let secs = now_ms.saturating_sub(start) / 1000;
        self.cumulative_run_secs += secs;
        self.session_start_ms = Some(start + secs * 1000);
        secs
    }

    /// Settle and close the session. Returns the seconds moved.
    pub fn end_session(&mut self, now_ms: u64) -> u64 {
        let secs = self.settle(now_ms);
        self.session_start_ms = None;
        secs
    }

    // ── Service milestones ────────────────────────────────────────

    pub fn next_milestone_secs(&self, interval_secs: u64) -> u64 {
        self.last_service_milestone_secs + interval_secs
    }

    pub fn record_milestone(&mut self, milestone_secs: u64) {
        if milestone_secs > self.last_service_milestone_secs {
            self.last_service_milestone_secs = milestone_secs;
        }
    }

    // ── Queries / reset ───────────────────────────────────────────

    pub fn cumulative_secs(&self) -> u64 {
        self.cumulative_run_secs
    }

    pub fn last_milestone_secs(&self) -> u64 {
        self.last_service_milestone_secs
    }

    /// Zero both durable counters. An open session keeps running from
    /// its current unsettled start.
    pub fn clear(&mut self) {
        self.cumulative_run_secs = 0;
        self.last_service_milestone_secs = 0;
    }
}
