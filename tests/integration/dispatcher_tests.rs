//! Integration tests for SMS command handling.
//!
//! Each test sends commands through `dispatch` exactly as the control loop
//! does after draining the inbox, then checks replies and state.

use super::mock_hw::{ALERT_ADDRESS, OPERATOR, TestRig};
use firepump::app::commands::{PumpCommand, Rejection, USAGE};
use firepump::app::events::AppEvent;
use firepump::fsm::PumpState;
use firepump::runtime::CounterStore;

/// Drive the rig until the pump reports Running.
fn get_running(rig: &mut TestRig) {
    rig.hw.set_pump_pressure(true);
    rig.sms_from(OPERATOR, "start");
    rig.run_until(6);
    assert_eq!(rig.app.state(), PumpState::Running);
}

// ── start ─────────────────────────────────────────────────────

#[test]
fn start_is_acknowledged_then_confirmed() {
    let mut rig = TestRig::new();
    get_running(&mut rig);
    assert_eq!(
        rig.sms.to(OPERATOR),
        vec![
            "Start command received, cranking engine",
            "Pump RUNNING (started on attempt 1/3)"
        ]
    );
    assert_eq!(rig.app.pending_requester(), Some(OPERATOR));
}

#[test]
fn start_while_running_is_rejected() {
    let mut rig = TestRig::new();
    get_running(&mut rig);
    let calls_before = rig.hw.calls.len();
    rig.sms.clear();

    rig.sms_from(OPERATOR, "start");
    assert_eq!(rig.sms.to(OPERATOR), vec!["Pump already running"]);
    assert_eq!(rig.app.state(), PumpState::Running);
    assert_eq!(rig.hw.calls.len(), calls_before, "no actuator writes");
    assert!(rig.sink.events.contains(&AppEvent::CommandRejected {
        command: PumpCommand::Start,
        reason: Rejection::AlreadyRunning,
    }));
}

#[test]
fn start_while_starting_is_rejected() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    rig.tick_at(2);
    rig.sms.clear();

    rig.sms_from("+15559998888", "START");
    assert_eq!(rig.sms.to("+15559998888"), vec!["Start already in progress"]);
    assert_eq!(rig.app.pending_requester(), Some(OPERATOR));
    assert_eq!(rig.hw.crank_engagements, 1);
}

#[test]
fn start_from_failed_begins_new_sequence() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    rig.run_until(45);
    assert_eq!(rig.app.state(), PumpState::Failed);

    rig.sms_from(OPERATOR, "start");
    assert_eq!(rig.app.state(), PumpState::Starting);
    assert_eq!(rig.hw.crank_engagements, 4);
}

// ── stop ──────────────────────────────────────────────────────

#[test]
fn stop_while_idle_only_replies() {
    let mut rig = TestRig::new();
    rig.tick_at(1);
    let calls_before = rig.hw.calls.len();
    let events_before = rig.sink.events.len();

    rig.sms_from(OPERATOR, "stop");

    assert_eq!(rig.sms.to(OPERATOR), vec!["Pump not running"]);
    assert_eq!(rig.app.state(), PumpState::Idle);
    assert_eq!(rig.hw.calls.len(), calls_before);
    assert_eq!(rig.app.pending_requester(), None);
    assert_eq!(
        &rig.sink.events[events_before..],
        &[AppEvent::CommandRejected {
            command: PumpCommand::Stop,
            reason: Rejection::NotRunning,
        }]
    );
}

#[test]
fn stop_while_starting_is_rejected() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    rig.tick_at(3);
    rig.sms.clear();
    rig.sms_from(OPERATOR, "stop");
    assert_eq!(rig.sms.to(OPERATOR), vec!["Pump not running"]);
    assert_eq!(rig.app.state(), PumpState::Starting);
}

#[test]
fn stop_while_running_settles_hours() {
    let mut rig = TestRig::new();
    get_running(&mut rig);
    rig.run_until(6 + 360);
    rig.sms.clear();

    rig.sms_from(OPERATOR, "Stop");
    assert_eq!(rig.app.state(), PumpState::Idle);
    assert!(!rig.hw.crank_on() && !rig.hw.fuel_on());
    assert_eq!(
        rig.sms.to(OPERATOR),
        vec!["Stop command received", "Pump STOPPED. Run hours: 0.1"]
    );
    assert_eq!(
        rig.nvs.load_counters().unwrap().unwrap().cumulative_run_secs,
        360
    );
}

#[test]
fn stop_from_other_sender_notifies_them() {
    let mut rig = TestRig::new();
    get_running(&mut rig);
    rig.sms.clear();
    rig.sms_from(ALERT_ADDRESS, "stop");
    assert_eq!(rig.app.pending_requester(), Some(ALERT_ADDRESS));
    assert_eq!(rig.sms.to(ALERT_ADDRESS).len(), 2);
    assert!(rig.sms.to(OPERATOR).is_empty());
}

#[test]
fn stop_clears_a_failed_start() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    rig.run_until(45);
    rig.sms_from(OPERATOR, "stop");
    assert_eq!(rig.app.state(), PumpState::Idle);
    assert_eq!(rig.app.runtime().cumulative_secs(), 0);
}

// ── status / runtime ──────────────────────────────────────────

#[test]
fn status_reports_current_state() {
    let mut rig = TestRig::new();
    rig.tick_at(1);
    rig.sms_from(OPERATOR, "  STATUS ");
    let replies = rig.sms.to(OPERATOR);
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("FIRE PUMP: IDLE\nBatt: 12.6V"));
    assert!(replies[0].contains("Run hours: 0.0"));
    assert!(replies[0].contains("Service in: 5.0h"));
}

#[test]
fn status_while_starting_shows_attempt() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    rig.run_until(16);
    rig.sms.clear();
    rig.sms_from(OPERATOR, "status");
    assert!(rig.sms.to(OPERATOR)[0].starts_with("FIRE PUMP: STARTING (attempt 2/3)"));
}

#[test]
fn runtime_includes_open_session() {
    let mut rig = TestRig::new();
    get_running(&mut rig);
    rig.run_until(6 + 1_800);
    rig.sms.clear();
    rig.sms_from(OPERATOR, "runtime");
    assert_eq!(rig.sms.to(OPERATOR), vec!["Engine run hours: 0.5"]);
}

// ── reset ─────────────────────────────────────────────────────

#[test]
fn reset_without_fault_is_rejected() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "reset");
    assert_eq!(rig.sms.to(OPERATOR), vec!["No fault to reset"]);
}

#[test]
fn reset_returns_failed_to_idle() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "start");
    rig.run_until(45);
    rig.sms.clear();

    rig.sms_from(OPERATOR, "reset");
    assert_eq!(rig.app.state(), PumpState::Idle);
    assert_eq!(rig.sms.to(OPERATOR), vec!["Fault cleared, pump IDLE"]);
    rig.tick_at(46);
    assert!(!rig.hw.crank_on() && !rig.hw.fuel_on());
}

// ── clearhours ────────────────────────────────────────────────

#[test]
fn clearhours_is_idempotent() {
    let mut rig = TestRig::new();
    get_running(&mut rig);
    rig.run_until(6 + 600);
    rig.sms_from(OPERATOR, "stop");
    assert_eq!(rig.app.runtime().cumulative_secs(), 600);
    rig.sms.clear();

    rig.sms_from(OPERATOR, "clearhours");
    let after_first = rig.nvs.load_counters().unwrap();
    rig.sms_from(OPERATOR, "CLEARHOURS");
    let after_second = rig.nvs.load_counters().unwrap();

    assert_eq!(after_first, after_second);
    assert_eq!(rig.app.runtime().cumulative_secs(), 0);
    assert_eq!(rig.app.runtime().last_milestone_secs(), 0);
    assert_eq!(
        rig.sms.to(OPERATOR),
        vec!["Run hours cleared", "Run hours cleared"]
    );
}

// ── misc ──────────────────────────────────────────────────────

#[test]
fn unknown_command_gets_usage() {
    let mut rig = TestRig::new();
    rig.sms_from(OPERATOR, "open the valve");
    assert_eq!(rig.sms.to(OPERATOR), vec![USAGE]);
    assert!(rig.sink.events.contains(&AppEvent::CommandAccepted {
        command: PumpCommand::Unknown,
    }));
}

#[test]
fn command_without_sender_is_ignored() {
    let mut rig = TestRig::new();
    rig.sms_from("   ", "start");
    assert_eq!(rig.app.state(), PumpState::Idle);
    assert!(rig.sms.outbox.is_empty());
}

#[test]
fn alert_address_requester_gets_single_failure_message() {
    let mut rig = TestRig::new();
    rig.sms_from(ALERT_ADDRESS, "start");
    rig.run_until(45);
    assert_eq!(rig.app.state(), PumpState::Failed);
    assert_eq!(rig.sms.containing("FAILED to start"), 1);
}
