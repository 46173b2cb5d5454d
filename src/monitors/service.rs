//! Service-interval monitor.
//!
//! Raises one [`ServiceDue`] per service milestone the engine's run time
//! crosses. Milestones are multiples of the interval; the last one reached
//! is durable so an alert is never repeated after a reboot and never skipped
//! when a single check spans several intervals.

use crate::runtime::RuntimeCounter;

/// A crossed service milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDue {
    pub milestone_secs: u64,
    pub total_secs: u64,
}

impl ServiceDue {
    pub fn message(&self) -> String {
        format!(
            "SERVICE REQUIRED: fire pump engine at {} hours (service due at {} hours)",
            crate::app::report::format_hours(self.total_secs),
            crate::app::report::format_hours(self.milestone_secs),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ServiceMonitor {
    interval_secs: u64,
}

impl ServiceMonitor {
    pub fn new(interval_secs: u64) -> Self {
        Self { interval_secs }
    }

    /// Advance the counter's milestone past every interval the provisional
    /// run time has reached. The caller persists when the result is non-empty.
    pub fn check(&self, runtime: &mut RuntimeCounter, now_ms: u64) -> Vec<ServiceDue> {
        let mut due = Vec::new();
        if self.interval_secs == 0 {
            return due;
        }
        let total = runtime.provisional_total_secs(now_ms);
        loop {
            let next = runtime.next_milestone_secs(self.interval_secs);
            if total < next {
                break;
            }
            runtime.record_milestone(next);
            due.push(ServiceDue {
                milestone_secs: next,
                total_secs: total,
            });
        }
        due
    }

    /// Seconds of run time left until the next milestone.
    pub fn secs_until_due(&self, runtime: &RuntimeCounter, now_ms: u64) -> u64 {
        runtime
            .next_milestone_secs(self.interval_secs)
            .saturating_sub(runtime.provisional_total_secs(now_ms))
    }
}
