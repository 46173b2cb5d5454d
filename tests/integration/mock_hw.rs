//! Mock adapters for integration tests.
//!
//! Records every actuator call and outbound SMS so tests can assert on the
//! full history without touching real GPIO or a modem.

use chrono::NaiveDateTime;
use firepump::app::commands::CommandRequest;
use firepump::app::dispatcher::dispatch;
use firepump::app::events::AppEvent;
use firepump::app::ports::{
    ActuatorPort, ClockPort, EventSink, MessagingPort, Output, SensorPort, StorageError,
    StoragePort,
};
use firepump::app::service::PumpService;
use firepump::config::SystemConfig;
use firepump::fsm::context::SensorSnapshot;
use std::collections::HashMap;

pub const ALERT_ADDRESS: &str = "+15550000000";
pub const OPERATOR: &str = "+15551112222";

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Assert(Output),
    Deassert(Output),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    /// Returned verbatim from every `read_all`.
    pub snapshot: SensorSnapshot,
    pub calls: Vec<ActuatorCall>,
    crank: bool,
    fuel: bool,
    /// Off → on edges of the crank output.
    pub crank_engagements: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            snapshot: SensorSnapshot {
                battery_voltage_v: Some(12.6),
                ..SensorSnapshot::default()
            },
            calls: Vec::new(),
            crank: false,
            fuel: false,
            crank_engagements: 0,
        }
    }

    pub fn crank_on(&self) -> bool {
        self.crank
    }

    pub fn fuel_on(&self) -> bool {
        self.fuel
    }

    pub fn set_pump_pressure(&mut self, on: bool) {
        self.snapshot.pump_pressure = on;
    }

    pub fn set_battery(&mut self, volts: f32) {
        self.snapshot.battery_voltage_v = Some(volts);
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockHardware {
    fn assert_output(&mut self, output: Output) {
        self.calls.push(ActuatorCall::Assert(output));
        match output {
            Output::Crank => {
                if !self.crank {
                    self.crank_engagements += 1;
                }
                self.crank = true;
            }
            Output::Fuel => self.fuel = true,
        }
    }

    fn deassert_output(&mut self, output: Output) {
        self.calls.push(ActuatorCall::Deassert(output));
        match output {
            Output::Crank => self.crank = false,
            Output::Fuel => self.fuel = false,
        }
    }

    fn is_asserted(&self, output: Output) -> bool {
        match output {
            Output::Crank => self.crank,
            Output::Fuel => self.fuel,
        }
    }
}

impl SensorPort for MockHardware {
    fn read_all(&mut self, _config: &SystemConfig) -> SensorSnapshot {
        self.snapshot
    }
}

// ── MockClock ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockClock {
    pub now_ms: u64,
    pub local: Option<NaiveDateTime>,
}

impl ClockPort for MockClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn local_time(&self) -> Option<NaiveDateTime> {
        self.local
    }
}

// ── MockMessenger ─────────────────────────────────────────────

#[derive(Default)]
pub struct MockMessenger {
    pub outbox: Vec<(String, String)>,
}

#[allow(dead_code)]
impl MockMessenger {
    pub fn to(&self, address: &str) -> Vec<&str> {
        self.outbox
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, t)| t.as_str())
            .collect()
    }

    pub fn containing(&self, needle: &str) -> usize {
        self.outbox.iter().filter(|(_, t)| t.contains(needle)).count()
    }

    pub fn clear(&mut self) {
        self.outbox.clear();
    }
}

impl MessagingPort for MockMessenger {
    fn send(&mut self, address: &str, text: &str) {
        self.outbox.push((address.to_string(), text.to_string()));
    }
}

// ── MockNvs ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNvs {
    pub data: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(ns: &str, key: &str) -> String {
        format!("{ns}::{key}")
    }
}

impl StoragePort for MockNvs {
    fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.data.get(&Self::key(ns, key)).ok_or(StorageError::NotFound)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.data.insert(Self::key(ns, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&Self::key(ns, key));
        Ok(())
    }

    fn exists(&self, ns: &str, key: &str) -> bool {
        self.data.contains_key(&Self::key(ns, key))
    }
}

// ── LogSink ───────────────────────────────────────────────────

#[derive(Default)]
pub struct LogSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── TestRig ───────────────────────────────────────────────────

/// A started [`PumpService`] wired to every mock.
pub struct TestRig {
    pub app: PumpService,
    pub hw: MockHardware,
    pub clock: MockClock,
    pub sms: MockMessenger,
    pub nvs: MockNvs,
    pub sink: LogSink,
}

#[allow(dead_code)]
impl TestRig {
    /// Default config with an alert address set.
    pub fn new() -> Self {
        Self::with_config(SystemConfig {
            alert_address: ALERT_ADDRESS.into(),
            ..SystemConfig::default()
        })
    }

    pub fn with_config(config: SystemConfig) -> Self {
        Self::with_store(config, MockNvs::new())
    }

    /// Boot against pre-populated storage.
    pub fn with_store(config: SystemConfig, nvs: MockNvs) -> Self {
        let mut rig = Self {
            app: PumpService::new(config),
            hw: MockHardware::new(),
            clock: MockClock::default(),
            sms: MockMessenger::default(),
            nvs,
            sink: LogSink::new(),
        };
        rig.app.restore(&rig.nvs);
        rig.app.start(&mut rig.hw, &mut rig.sink);
        rig
    }

    /// Run one control tick at `secs` after boot.
    pub fn tick_at(&mut self, secs: u64) {
        self.clock.now_ms = secs * 1000;
        self.app.tick(
            &self.clock,
            &mut self.hw,
            &mut self.sms,
            &mut self.nvs,
            &mut self.sink,
        );
    }

    /// Tick once per second from the current time up to and including `secs`.
    pub fn run_until(&mut self, secs: u64) {
        let mut t = self.clock.now_ms / 1000;
        while t < secs {
            t += 1;
            self.tick_at(t);
        }
    }

    /// Deliver an inbound SMS at the current time.
    pub fn sms_from(&mut self, sender: &str, text: &str) {
        let request = CommandRequest::new(sender, text);
        dispatch(
            &mut self.app,
            &request,
            self.clock.now_ms,
            &mut self.hw,
            &mut self.sms,
            &mut self.nvs,
            &mut self.sink,
        );
    }
}
