//! Integration tests for the PumpService → FSM → actuators pipeline.
//!
//! These run on the host (x86_64) and drive the controller tick by tick
//! against mock adapters, checking outputs, state and outbound SMS.

use chrono::{NaiveDate, NaiveDateTime};

use super::mock_hw::{ALERT_ADDRESS, MockNvs, OPERATOR, TestRig};
use firepump::app::events::{AlertKind, AppEvent};
use firepump::app::ports::StoragePort;
use firepump::config::SystemConfig;
use firepump::fsm::PumpState;
use firepump::monitors::weekly::WEEKLY_KEY;
use firepump::runtime::{COUNTER_NAMESPACE, CounterStore, PersistedCounters};

fn monday(hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 7, 1)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

/// Check the output invariants after a tick.
fn assert_outputs_consistent(rig: &TestRig) {
    let state = rig.app.state();
    if matches!(state, PumpState::Idle | PumpState::Failed) {
        assert!(!rig.hw.crank_on(), "crank on in {state:?}");
        assert!(!rig.hw.fuel_on(), "fuel on in {state:?}");
    }
    let fuel_expected = matches!(state, PumpState::Starting | PumpState::Running);
    assert_eq!(rig.hw.fuel_on(), fuel_expected, "fuel in {state:?}");
    if state != PumpState::Starting {
        assert!(!rig.hw.crank_on(), "crank outside Starting ({state:?})");
    }
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boots_idle_with_outputs_off() {
    let rig = TestRig::new();
    assert_eq!(rig.app.state(), PumpState::Idle);
    assert!(!rig.hw.crank_on());
    assert!(!rig.hw.fuel_on());
    assert!(rig.sink.events.contains(&AppEvent::Started(PumpState::Idle)));
}

#[test]
fn idle_ticks_keep_outputs_off() {
    let mut rig = TestRig::new();
    rig.hw.set_pump_pressure(true);
    for t in 1..=30 {
        rig.tick_at(t);
        assert_eq!(rig.app.state(), PumpState::Idle);
        assert_outputs_consistent(&rig);
    }
    assert_eq!(rig.hw.crank_engagements, 0);
}

// ── Start sequence ────────────────────────────────────────────

#[test]
fn three_attempts_without_pressure_end_in_failed() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    assert_eq!(rig.app.state(), PumpState::Starting);
    assert!(rig.hw.crank_on(), "starter engaged immediately");
    assert!(rig.hw.fuel_on());

    for t in 1..45 {
        rig.tick_at(t);
        assert_eq!(rig.app.state(), PumpState::Starting, "at t={t}");
        assert_outputs_consistent(&rig);
    }
    rig.tick_at(45);
    assert_eq!(rig.app.state(), PumpState::Failed);
    assert_outputs_consistent(&rig);
    assert_eq!(rig.hw.crank_engagements, 3);

    assert!(
        rig.sms
            .to(OPERATOR)
            .contains(&"Pump FAILED to start after 3 attempts. Send RESET to clear.")
    );
    assert_eq!(
        rig.sms.to(ALERT_ADDRESS),
        vec!["ALERT: Fire pump FAILED to start after 3 attempts"]
    );
    assert!(rig.sink.events.contains(&AppEvent::AlertRaised {
        kind: AlertKind::StartFailed,
        delivered: true,
    }));
}

#[test]
fn crank_timing_follows_configuration() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");

    let expect_crank = |t: u64| matches!(t, 0..5 | 15..20 | 30..35);
    for t in 1..45 {
        rig.tick_at(t);
        assert_eq!(rig.hw.crank_on(), expect_crank(t), "crank at t={t}");
    }
}

#[test]
fn failed_pump_stays_off_until_reset() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    rig.run_until(45);
    assert_eq!(rig.app.state(), PumpState::Failed);

    // Pressure appearing later does not revive a failed start.
    rig.hw.set_pump_pressure(true);
    rig.run_until(120);
    assert_eq!(rig.app.state(), PumpState::Failed);
    assert_outputs_consistent(&rig);
    assert_eq!(rig.hw.crank_engagements, 3);
}

#[test]
fn pressure_one_second_into_confirm_window_means_running() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    rig.run_until(5);
    assert!(!rig.hw.crank_on(), "crank released after 5 s");
    assert_eq!(rig.app.state(), PumpState::Starting);

    rig.hw.set_pump_pressure(true);
    rig.tick_at(6);
    assert_eq!(rig.app.state(), PumpState::Running);
    assert_outputs_consistent(&rig);
    assert_eq!(rig.hw.crank_engagements, 1);
    assert!(
        rig.sms
            .to(OPERATOR)
            .contains(&"Pump RUNNING (started on attempt 1/3)")
    );
    assert!(rig.app.runtime().session_active());
}

#[test]
fn pressure_while_cranking_is_ignored() {
    let mut rig = TestRig::new();
    rig.hw.set_pump_pressure(true);
    rig.sms_from(OPERATOR, "start");
    for t in 1..5 {
        rig.tick_at(t);
        assert_eq!(rig.app.state(), PumpState::Starting, "at t={t}");
        assert!(rig.hw.crank_on());
    }
    rig.tick_at(5);
    assert_eq!(rig.app.state(), PumpState::Starting, "release tick");
    rig.tick_at(6);
    assert_eq!(rig.app.state(), PumpState::Running);
}

#[test]
fn second_attempt_success_is_reported() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    rig.run_until(16);
    assert_eq!(rig.hw.crank_engagements, 2);
    rig.run_until(20);
    rig.hw.set_pump_pressure(true);
    rig.tick_at(21);
    assert_eq!(rig.app.state(), PumpState::Running);
    assert!(
        rig.sms
            .to(OPERATOR)
            .contains(&"Pump RUNNING (started on attempt 2/3)")
    );
}

#[test]
fn crank_attempt_events_are_emitted() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    rig.run_until(45);
    let attempts: Vec<u8> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::CrankAttempt { attempt, max: 3 } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);
}

#[test]
fn restart_after_reset_counts_attempts_from_one() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    rig.run_until(45);
    let report = rig.app.status_report(45_000);
    assert_eq!(report.state, PumpState::Failed);
    assert_eq!(report.start_attempt, None);

    rig.sms_from(OPERATOR, "reset");
    rig.sms_from(OPERATOR, "start");
    assert_eq!(
        rig.app.status_report(45_000).start_attempt,
        Some((1, 3))
    );
}

// ── Runtime and service ───────────────────────────────────────

/// Start the engine with pressure present; returns the tick it went Running.
fn start_running(rig: &mut TestRig) -> u64 {
    rig.hw.set_pump_pressure(true);
    rig.sms_from(OPERATOR, "start");
    let mut t = rig.clock.now_ms / 1000;
    while rig.app.state() != PumpState::Running {
        t += 1;
        rig.tick_at(t);
        assert!(t < 60, "engine never confirmed");
    }
    t
}

#[test]
fn long_session_accumulates_and_alerts_once() {
    let mut rig = TestRig::new();
    let running_at = start_running(&mut rig);

    let stop_at = running_at + 18_005;
    rig.run_until(stop_at);
    rig.sms_from(OPERATOR, "stop");

    assert_eq!(rig.app.state(), PumpState::Idle);
    assert_eq!(rig.app.runtime().cumulative_secs(), 18_005);
    assert_eq!(rig.sms.containing("SERVICE REQUIRED"), 1);
    assert_eq!(
        rig.sms.to(ALERT_ADDRESS)[0],
        "SERVICE REQUIRED: fire pump engine at 5.0 hours (service due at 5.0 hours)"
    );

    let stored = rig.nvs.load_counters().unwrap().unwrap();
    assert_eq!(
        stored,
        PersistedCounters {
            cumulative_run_secs: 18_005,
            last_service_milestone_secs: 18_000,
        }
    );
}

#[test]
fn milestone_crossing_persists_mid_session() {
    let mut rig = TestRig::new();
    let running_at = start_running(&mut rig);
    rig.run_until(running_at + 18_000);

    let stored = rig.nvs.load_counters().unwrap().unwrap();
    assert_eq!(stored.cumulative_run_secs, 18_000);
    assert_eq!(stored.last_service_milestone_secs, 18_000);
    assert_eq!(rig.app.state(), PumpState::Running);
}

#[test]
fn counters_survive_reboot() {
    let mut nvs = MockNvs::new();
    nvs.save_counters(&PersistedCounters {
        cumulative_run_secs: 7_200,
        last_service_milestone_secs: 0,
    })
    .unwrap();
    let mut rig = TestRig::with_store(
        SystemConfig {
            alert_address: ALERT_ADDRESS.into(),
            ..SystemConfig::default()
        },
        nvs,
    );
    rig.sms_from(OPERATOR, "runtime");
    assert_eq!(rig.sms.to(OPERATOR), vec!["Engine run hours: 2.0"]);
}

#[test]
fn failed_counter_write_is_reported_not_fatal() {
    let mut rig = TestRig::new();
    let running_at = start_running(&mut rig);
    rig.run_until(running_at + 60);
    rig.nvs.fail_writes = true;
    rig.sms_from(OPERATOR, "stop");

    assert_eq!(rig.app.state(), PumpState::Idle);
    assert_eq!(rig.app.runtime().cumulative_secs(), 60);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::PersistFailed("runtime counters"))
    );
}

// ── Battery ───────────────────────────────────────────────────

#[test]
fn voltage_dip_alerts_once_and_recovers_once() {
    let mut rig = TestRig::new();
    for (t, volts) in [(1, 11.0), (2, 12.0), (3, 12.6)] {
        rig.hw.set_battery(volts);
        rig.tick_at(t);
    }
    assert_eq!(
        rig.sms.to(ALERT_ADDRESS),
        vec![
            "ALERT: Fire pump battery LOW 11.0V",
            "Fire pump battery recovered 12.6V"
        ]
    );
}

#[test]
fn sustained_low_voltage_does_not_repeat() {
    let mut rig = TestRig::new();
    rig.hw.set_battery(10.8);
    rig.run_until(120);
    assert_eq!(rig.sms.containing("battery LOW"), 1);
    assert!(rig.app.status_report(120_000).to_string().contains(" LOW"));
}

#[test]
fn unread_battery_raises_no_alert() {
    let mut rig = TestRig::new();
    rig.hw.snapshot.battery_voltage_v = None;
    rig.run_until(30);
    assert_eq!(rig.sms.containing("battery"), 0);
    assert!(rig.app.status_report(30_000).to_string().contains("Batt: --"));

    // First good reading is judged normally.
    rig.hw.set_battery(11.0);
    rig.tick_at(31);
    assert_eq!(rig.sms.to(ALERT_ADDRESS), vec!["ALERT: Fire pump battery LOW 11.0V"]);
}

#[test]
fn alerts_without_address_are_dropped() {
    let mut rig = TestRig::with_config(SystemConfig::default());
    rig.hw.set_battery(11.0);
    rig.tick_at(1);
    assert!(rig.sms.outbox.is_empty());
    assert!(rig.sink.events.contains(&AppEvent::AlertRaised {
        kind: AlertKind::LowVoltage,
        delivered: false,
    }));
}

// ── Weekly report ─────────────────────────────────────────────

#[test]
fn weekly_report_fires_once_in_window() {
    let mut rig = TestRig::new();
    rig.clock.local = Some(monday(8, 59));
    rig.tick_at(1);
    assert!(rig.sms.outbox.is_empty());

    rig.clock.local = Some(monday(9, 0));
    rig.tick_at(2);
    rig.clock.local = Some(monday(9, 30));
    rig.tick_at(3);

    let reports = rig.sms.to(ALERT_ADDRESS);
    assert_eq!(reports.len(), 1);
    assert!(reports[0].starts_with("WEEKLY REPORT\nFIRE PUMP: IDLE"));
    assert!(rig.nvs.exists(COUNTER_NAMESPACE, WEEKLY_KEY));
}

#[test]
fn weekly_report_not_repeated_after_reboot() {
    let mut rig = TestRig::new();
    rig.clock.local = Some(monday(9, 0));
    rig.tick_at(1);
    assert_eq!(rig.sms.to(ALERT_ADDRESS).len(), 1);

    let nvs = std::mem::take(&mut rig.nvs);
    let mut rebooted = TestRig::with_store(
        SystemConfig {
            alert_address: ALERT_ADDRESS.into(),
            ..SystemConfig::default()
        },
        nvs,
    );
    rebooted.clock.local = Some(monday(9, 40));
    rebooted.tick_at(1);
    assert!(rebooted.sms.outbox.is_empty());
}

#[test]
fn no_weekly_report_without_wall_clock() {
    let mut rig = TestRig::new();
    rig.run_until(10);
    assert!(rig.sms.outbox.is_empty());
}
