//! GPIO / peripheral pin assignments for the fire-pump controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers. ESP32-S3: ADC1 channel *n* is on GPIO *n + 1*.

// ---------------------------------------------------------------------------
// Engine relays (opto-isolated relay board, active LOW)
// ---------------------------------------------------------------------------

/// Starter motor relay. LOW = energised.
pub const CRANK_RELAY_GPIO: i32 = 38;
/// Fuel solenoid relay. LOW = energised.
pub const FUEL_RELAY_GPIO: i32 = 39;

// ---------------------------------------------------------------------------
// Sensors: analog (ADC1, 12 dB attenuation, 12-bit)
// ---------------------------------------------------------------------------

/// Starting battery through a 47k/10k divider. GPIO 4.
pub const BATTERY_ADC_CHANNEL: u32 = 3;
/// Pump discharge pressure switch (pulled up, switch to 3V3). GPIO 5.
pub const PUMP_PRESSURE_ADC_CHANNEL: u32 = 4;
/// Engine oil pressure switch. GPIO 6.
pub const OIL_PRESSURE_ADC_CHANNEL: u32 = 5;
/// Diesel tank level sender (optional). GPIO 7.
pub const TANK_LEVEL_ADC_CHANNEL: u32 = 6;

/// Every ADC1 channel configured at boot.
pub const ADC_CHANNELS: [u32; 4] = [
    BATTERY_ADC_CHANNEL,
    PUMP_PRESSURE_ADC_CHANNEL,
    OIL_PRESSURE_ADC_CHANNEL,
    TANK_LEVEL_ADC_CHANNEL,
];

/// Full-scale raw ADC count (12-bit).
pub const ADC_MAX_RAW: u16 = 4095;

// ---------------------------------------------------------------------------
// GSM modem (SIM800-class, UART1)
// ---------------------------------------------------------------------------

// UART1 with TX on GPIO17 and RX on GPIO18. The HAL takes these as typed
// peripherals, so `main` names them directly.
pub const MODEM_BAUD: u32 = 9600;
