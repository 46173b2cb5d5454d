//! Pump service: the hexagonal core.
//!
//! [`PumpService`] owns the FSM, the output fail-safe, the run-time counter
//! and the monitors. All I/O flows through port traits injected at call
//! sites, so the whole controller runs against mock adapters on the host.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ ActuatorPort
//!   ClockPort ──▶ │          PumpService          │ ──▶ MessagingPort
//! StoragePort ◀─▶ │ FSM · FailSafe · Runtime ·    │ ──▶ EventSink
//!                 │ Voltage · Service · Weekly    │
//!                 └──────────────────────────────┘
//! ```
//!
//! Command operations (`request_start`, `request_stop`, ...) are called by
//! the [`dispatcher`](super::dispatcher) between ticks, never during one.

use log::{info, warn};

use crate::config::SystemConfig;
use crate::fsm::context::{OutputCommands, PumpContext, PumpNotice, SensorSnapshot};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, PumpState};
use crate::monitors::battery::{VoltageAlert, VoltageMonitor};
use crate::monitors::service::ServiceMonitor;
use crate::monitors::weekly::{self, WeeklyReportScheduler};
use crate::runtime::RuntimeCounter;
use crate::safety::FailSafeGuard;

use super::commands::Rejection;
use super::events::{AlertKind, AppEvent};
use super::ports::{
    ActuatorPort, ClockPort, EventSink, MessagingPort, Output, SensorPort, StoragePort,
};
use super::report::{StatusReport, format_hours};

// ───────────────────────────────────────────────────────────────
// PumpService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct PumpService {
    fsm: Fsm,
    ctx: PumpContext,
    guard: FailSafeGuard,
    runtime: RuntimeCounter,
    voltage: VoltageMonitor,
    service_monitor: ServiceMonitor,
    weekly: WeeklyReportScheduler,
    /// Originator of the latest accepted start/stop.
    pending_requester: Option<String>,
    tick_count: u64,
}

impl PumpService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM; call [`restore`](Self::restore) and
    /// [`start`](Self::start) next.
    pub fn new(config: SystemConfig) -> Self {
        let voltage = VoltageMonitor::new(&config);
        let service_monitor = ServiceMonitor::new(config.service_interval_secs);
        let weekly = WeeklyReportScheduler::new(config.weekly_report_day, config.weekly_report_hour);
        Self {
            fsm: Fsm::new(build_state_table(), PumpState::Idle),
            ctx: PumpContext::new(config),
            guard: FailSafeGuard::new(),
            runtime: RuntimeCounter::new(),
            voltage,
            service_monitor,
            weekly,
            pending_requester: None,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the durable counters and the last weekly report time.
    pub fn restore(&mut self, store: &impl StoragePort) {
        self.runtime.restore(store);
        self.weekly.restore(weekly::load_last_report(store));
    }

    /// Enter `Idle` and drive both outputs off.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        self.drive_outputs(hw, sink);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("PumpService started in {:?}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: sensors → FSM → fail-safe → outputs → monitors.
    ///
    /// `hw` satisfies **both** [`SensorPort`] and [`ActuatorPort`] so one
    /// adapter owns the pins without a double mutable borrow.
    pub fn tick(
        &mut self,
        clock: &impl ClockPort,
        hw: &mut (impl SensorPort + ActuatorPort),
        messenger: &mut impl MessagingPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let now_ms = clock.now_ms();
        self.ctx.now_ms = now_ms;
        let prev_state = self.fsm.current_state();

        // 1. Sensors
        self.ctx.sensors = hw.read_all(&self.ctx.config);

        // 2. FSM (the start sequencer runs inside Starting's update)
        self.fsm.tick(&mut self.ctx);
        self.process_notices(now_ms, messenger, sink);

        // 3. Fail-safe + outputs, re-asserted every tick
        self.drive_outputs(hw, sink);

        // 4. Monitors
        self.check_voltage(messenger, sink);
        self.check_service(now_ms, messenger, store, sink);
        if let Some(local) = clock.local_time() {
            self.check_weekly(local, now_ms, messenger, store, sink);
        }

        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }
    }

    // ── Operations (called by the dispatcher) ─────────────────

    /// Begin the start sequence from `Idle` or `Failed`.
    pub fn request_start(
        &mut self,
        originator: &str,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Rejection> {
        match self.fsm.current_state() {
            PumpState::Running => return Err(Rejection::AlreadyRunning),
            PumpState::Starting => return Err(Rejection::StartInProgress),
            PumpState::Idle | PumpState::Failed => {}
        }
        self.pending_requester = Some(originator.to_string());
        self.ctx.now_ms = now_ms;
        self.transition_to(PumpState::Starting, sink);
        self.drive_outputs(hw, sink);
        Ok(())
    }

    /// Stop the engine from `Running` or `Failed`. Returns the session
    /// seconds settled into the durable counter.
    pub fn request_stop(
        &mut self,
        originator: &str,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<u64, Rejection> {
        if !matches!(
            self.fsm.current_state(),
            PumpState::Running | PumpState::Failed
        ) {
            return Err(Rejection::NotRunning);
        }
        self.pending_requester = Some(originator.to_string());
        self.ctx.now_ms = now_ms;

        let added = if self.runtime.session_active() {
            let added = self.runtime.end_session(now_ms);
            sink.emit(&AppEvent::RuntimeSettled {
                added_secs: added,
                total_secs: self.runtime.cumulative_secs(),
            });
            self.persist_counters(store, sink);
            added
        } else {
            0
        };

        self.transition_to(PumpState::Idle, sink);
        self.drive_outputs(hw, sink);
        Ok(added)
    }

    /// Clear a failed start: `Failed` → `Idle`, attempt counter back to zero.
    pub fn reset_fault(
        &mut self,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Rejection> {
        if self.fsm.current_state() != PumpState::Failed {
            return Err(Rejection::NoFault);
        }
        self.transition_to(PumpState::Idle, sink);
        self.drive_outputs(hw, sink);
        Ok(())
    }

    /// Zero the durable run-time and service counters.
    pub fn clear_hours(&mut self, store: &mut impl StoragePort, sink: &mut impl EventSink) {
        self.runtime.clear();
        self.persist_counters(store, sink);
        info!("Run-time counters cleared");
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status_report(&self, now_ms: u64) -> StatusReport {
        let s = &self.ctx.sensors;
        StatusReport {
            state: self.fsm.current_state(),
            start_attempt: (self.fsm.current_state() == PumpState::Starting).then(|| {
                (
                    self.ctx.sequencer.attempt(),
                    self.ctx.config.max_start_attempts,
                )
            }),
            battery_voltage_v: s.battery_voltage_v,
            battery_low: self.voltage.is_low(),
            pump_pressure: s.pump_pressure,
            oil_pressure: s.oil_pressure,
            tank_level_raw: s.tank_level_raw,
            signal_strength: s.signal_strength,
            run_secs: self.runtime.provisional_total_secs(now_ms),
            secs_until_service: self.service_monitor.secs_until_due(&self.runtime, now_ms),
        }
    }

    /// Durable run time plus any open session.
    pub fn runtime_secs(&self, now_ms: u64) -> u64 {
        self.runtime.provisional_total_secs(now_ms)
    }

    /// Current FSM state.
    pub fn state(&self) -> PumpState {
        self.fsm.current_state()
    }

    /// Address awaiting the outcome of the latest start/stop.
    pub fn pending_requester(&self) -> Option<&str> {
        self.pending_requester.as_deref()
    }

    /// Output request after the last fail-safe pass.
    pub fn outputs(&self) -> OutputCommands {
        self.ctx.outputs
    }

    pub fn sensors(&self) -> &SensorSnapshot {
        &self.ctx.sensors
    }

    pub fn config(&self) -> &SystemConfig {
        &self.ctx.config
    }

    pub fn runtime(&self) -> &RuntimeCounter {
        &self.runtime
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn transition_to(&mut self, next: PumpState, sink: &mut impl EventSink) {
        let prev = self.fsm.current_state();
        self.fsm.force_transition(next, &mut self.ctx);
        if prev != next {
            sink.emit(&AppEvent::StateChanged { from: prev, to: next });
        }
    }

    /// Fail-safe pass, then write both outputs to the port.
    fn drive_outputs(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        let state = self.fsm.current_state();
        if self
            .guard
            .enforce(state, &self.ctx.sequencer, &mut self.ctx.outputs)
        {
            sink.emit(&AppEvent::FailSafeCorrected(state));
        }

        let out = self.ctx.outputs;
        for (output, on) in [(Output::Crank, out.crank), (Output::Fuel, out.fuel)] {
            if on {
                hw.assert_output(output);
            } else {
                hw.deassert_output(output);
            }
        }
    }

    fn process_notices(
        &mut self,
        now_ms: u64,
        messenger: &mut impl MessagingPort,
        sink: &mut impl EventSink,
    ) {
        let max = self.ctx.config.max_start_attempts;
        for notice in self.ctx.take_notices() {
            match notice {
                PumpNotice::CrankAttempt(attempt) => {
                    sink.emit(&AppEvent::CrankAttempt { attempt, max });
                }
                PumpNotice::Confirmed(attempt) => {
                    self.runtime.begin_session(now_ms);
                    self.notify_requester(
                        messenger,
                        &format!("Pump RUNNING (started on attempt {attempt}/{max})"),
                    );
                }
                PumpNotice::Exhausted(attempt) => {
                    self.notify_requester(
                        messenger,
                        &format!(
                            "Pump FAILED to start after {attempt} attempts. Send RESET to clear."
                        ),
                    );
                    let requester_is_alert_address = self
                        .pending_requester
                        .as_deref()
                        .is_some_and(|r| r == self.ctx.config.alert_address);
                    if requester_is_alert_address {
                        sink.emit(&AppEvent::AlertRaised {
                            kind: AlertKind::StartFailed,
                            delivered: true,
                        });
                    } else {
                        self.broadcast(
                            messenger,
                            sink,
                            AlertKind::StartFailed,
                            &format!(
                                "ALERT: Fire pump FAILED to start after {attempt} attempts"
                            ),
                        );
                    }
                }
            }
        }
    }

    fn check_voltage(&mut self, messenger: &mut impl MessagingPort, sink: &mut impl EventSink) {
        // No alerts on a battery that has never been read.
        let Some(volts) = self.ctx.sensors.battery_voltage_v else {
            return;
        };
        let Some(alert) = self.voltage.evaluate(volts) else {
            return;
        };
        let kind = match alert {
            VoltageAlert::Low { volts } => {
                warn!("Battery low: {:.2}V", volts);
                AlertKind::LowVoltage
            }
            VoltageAlert::Recovered { volts } => {
                info!("Battery recovered: {:.2}V", volts);
                AlertKind::VoltageRecovered
            }
        };
        self.broadcast(messenger, sink, kind, &alert.message());
    }

    fn check_service(
        &mut self,
        now_ms: u64,
        messenger: &mut impl MessagingPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        if self.fsm.current_state() != PumpState::Running || !self.runtime.session_active() {
            return;
        }
        let due = self.service_monitor.check(&mut self.runtime, now_ms);
        if due.is_empty() {
            return;
        }
        let added = self.runtime.settle(now_ms);
        sink.emit(&AppEvent::RuntimeSettled {
            added_secs: added,
            total_secs: self.runtime.cumulative_secs(),
        });
        self.persist_counters(store, sink);
        for d in due {
            warn!(
                "Service milestone {}h reached at {}h",
                format_hours(d.milestone_secs),
                format_hours(d.total_secs)
            );
            self.broadcast(messenger, sink, AlertKind::ServiceDue, &d.message());
        }
    }

    fn check_weekly(
        &mut self,
        local: chrono::NaiveDateTime,
        now_ms: u64,
        messenger: &mut impl MessagingPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        if !self.weekly.poll(local) {
            return;
        }
        info!("Weekly report due at {}", local);
        let text = format!("WEEKLY REPORT\n{}", self.status_report(now_ms));
        self.broadcast(messenger, sink, AlertKind::WeeklyReport, &text);
        if let Err(e) = weekly::save_last_report(store, local) {
            warn!("Failed to persist weekly report time: {e}");
            sink.emit(&AppEvent::PersistFailed("weekly report time"));
        }
    }

    fn persist_counters(&self, store: &mut impl StoragePort, sink: &mut impl EventSink) {
        if self.runtime.persist(store).is_err() {
            sink.emit(&AppEvent::PersistFailed("runtime counters"));
        }
    }

    fn notify_requester(&self, messenger: &mut impl MessagingPort, text: &str) {
        match self.pending_requester.as_deref() {
            Some(addr) => messenger.send(addr, text),
            None => info!("No pending requester for: {}", text),
        }
    }

    /// Send to the configured alert address, if any.
    fn broadcast(
        &self,
        messenger: &mut impl MessagingPort,
        sink: &mut impl EventSink,
        kind: AlertKind,
        text: &str,
    ) {
        let addr = self.ctx.config.alert_address.as_str();
        let delivered = !addr.is_empty();
        if delivered {
            messenger.send(addr, text);
        } else {
            warn!("No alert address configured, alert dropped: {}", text);
        }
        sink.emit(&AppEvent::AlertRaised { kind, delivered });
    }
}
