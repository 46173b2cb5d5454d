//! Port traits: the boundary between the pump controller core and the
//! hardware, modem, clock and flash behind it.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PumpService (domain)
//! ```
//!
//! Adapters implement these traits and [`PumpService`](super::service::PumpService)
//! consumes them through generics, so the start/stop logic and the monitors
//! never touch a GPIO, a UART or an NVS handle directly.

use chrono::NaiveDateTime;

use crate::config::SystemConfig;
use crate::fsm::context::SensorSnapshot;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the control loop calls this once per tick.
pub trait SensorPort {
    /// Read every sensor and return a unified snapshot.
    ///
    /// The configuration carries the calibration (pressure switch threshold,
    /// battery divider) and whether the optional tank sensor is fitted.
    fn read_all(&mut self, config: &SystemConfig) -> SensorSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The two engine outputs the controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    /// Starter motor relay.
    Crank,
    /// Fuel solenoid (engine runs while energised).
    Fuel,
}

/// Write-side port: the domain asserts and releases engine outputs.
///
/// "Assert" means the output is active (relay energised). Relay polarity is
/// the adapter's concern.
pub trait ActuatorPort {
    fn assert_output(&mut self, output: Output);

    fn deassert_output(&mut self, output: Output);

    /// Whether the output is currently asserted.
    fn is_asserted(&self, output: Output) -> bool;

    /// Release every output.
    fn all_off(&mut self) {
        self.deassert_output(Output::Crank);
        self.deassert_output(Output::Fuel);
    }
}

// ───────────────────────────────────────────────────────────────
// Messaging port (driven adapter: domain → SMS)
// ───────────────────────────────────────────────────────────────

/// Outbound text messages.
///
/// Fire-and-forget: delivery failures are the adapter's to log, the core
/// never retries.
pub trait MessagingPort {
    fn send(&mut self, address: &str, text: &str);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time plus an optional wall clock.
pub trait ClockPort {
    /// Milliseconds since boot. Never goes backwards.
    fn now_ms(&self) -> u64;

    /// Local wall-clock time, `None` until the clock has been synchronised.
    fn local_time(&self) -> Option<NaiveDateTime>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST call [`SystemConfig::validate`] before persisting
/// and reject out-of-range values with [`ConfigError::ValidationFailed`]
/// rather than clamping them.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for run-time counters and report stamps.
///
/// Keys are namespaced. Writes MUST be atomic: the ESP-IDF NVS API
/// guarantees this natively, the in-memory simulation trivially.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Stored blob could not be encoded or decoded.
    Corrupted,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "stored value corrupted"),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}
