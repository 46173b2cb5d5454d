//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the fire-pump controller:
//! FSM orchestration, the monitors and the SMS command protocol. All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod ports;
pub mod report;
pub mod service;
