//! Crank / confirm / retry timing for the `Starting` state.
//!
//! ```text
//!   begin ──▶ Cranking ──(crank time)──▶ WaitingConfirm ──(pressure)──▶ Confirmed
//!                 ▲                             │
//!                 └──(confirm window, retries)──┤
//!                                               └──(no attempts left)──▶ Exhausted
//! ```
//!
//! Pure timing logic over millisecond timestamps; the `Starting` state
//! handlers translate each [`SequencerStep`] into output changes.

/// Where the current start attempt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
    /// No start in progress.
    Inactive,
    /// Starter engaged since the given time.
    Cranking { since_ms: u64 },
    /// Starter released, watching for pump pressure since the given time.
    WaitingConfirm { since_ms: u64 },
}

/// Outcome of one [`StartSequencer::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerStep {
    /// Nothing changed this tick.
    Holding,
    /// Crank time elapsed: release the starter, keep fuel on.
    CrankReleased,
    /// Confirm window expired, cranking again for this attempt number.
    Retry(u8),
    /// Pump pressure seen while waiting.
    Confirmed(u8),
    /// Confirm window expired on the last attempt.
    Exhausted(u8),
}

/// Durations and limits for one start sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerTiming {
    pub crank_ms: u64,
    pub confirm_ms: u64,
    pub max_attempts: u8,
}

impl SequencerTiming {
    pub fn from_config(config: &crate::config::SystemConfig) -> Self {
        Self {
            crank_ms: config.crank_duration_ms(),
            confirm_ms: config.confirm_delay_ms(),
            max_attempts: config.max_start_attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartSequencer {
    phase: StartPhase,
    attempt: u8,
}

impl Default for StartSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl StartSequencer {
    pub const fn new() -> Self {
        Self {
            phase: StartPhase::Inactive,
            attempt: 0,
        }
    }

    /// Start attempt 1: cranking from `now_ms`.
    pub fn begin(&mut self, now_ms: u64) {
        self.attempt = 1;
        self.phase = StartPhase::Cranking { since_ms: now_ms };
    }

    /// Advance the sequence for one tick.
    pub fn advance(&mut self, now_ms: u64, pump_pressure: bool, timing: &SequencerTiming) -> SequencerStep {
        match self.phase {
            StartPhase::Inactive => SequencerStep::Holding,
            StartPhase::Cranking { since_ms } => {
                if now_ms.saturating_sub(since_ms) >= timing.crank_ms {
                    self.phase = StartPhase::WaitingConfirm { since_ms: now_ms };
                    SequencerStep::CrankReleased
                } else {
                    SequencerStep::Holding
                }
            }
            StartPhase::WaitingConfirm { since_ms } => {
                if pump_pressure {
                    self.phase = StartPhase::Inactive;
                    return SequencerStep::Confirmed(self.attempt);
                }
                if now_ms.saturating_sub(since_ms) < timing.confirm_ms {
                    return SequencerStep::Holding;
                }
                if self.attempt < timing.max_attempts {
                    self.attempt += 1;
                    self.phase = StartPhase::Cranking { since_ms: now_ms };
                    SequencerStep::Retry(self.attempt)
                } else {
                    self.phase = StartPhase::Inactive;
                    SequencerStep::Exhausted(self.attempt)
                }
            }
        }
    }

    /// Stop sequencing but keep the attempt number for reporting.
    pub fn finish(&mut self) {
        self.phase = StartPhase::Inactive;
    }

    /// Forget the sequence entirely (attempt counter back to zero).
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn phase(&self) -> StartPhase {
        self.phase
    }

    /// Current (or last) attempt number, 0 when none has been made.
    pub fn attempt(&self) -> u8 {
        self.attempt
    }

    pub fn is_cranking(&self) -> bool {
        matches!(self.phase, StartPhase::Cranking { .. })
    }

    pub fn is_active(&self) -> bool {
        self.phase != StartPhase::Inactive
    }
}
