//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to              |
//! |------------|--------------------|--------------------------|
//! | `hardware` | SensorPort         | ESP32 ADC1 oneshot       |
//! |            | ActuatorPort       | Crank / fuel relays      |
//! | `log_sink` | EventSink          | Serial log output        |
//! | `modem`    | MessagingPort      | GSM modem over UART      |
//! | `nvs`      | ConfigPort         | NVS / in-memory store    |
//! |            | StoragePort        |                          |
//! | `time`     | ClockPort          | ESP32 timer + modem clock|

pub mod hardware;
pub mod log_sink;
pub mod modem;
pub mod nvs;
pub mod time;
