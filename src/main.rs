//! Fire pump controller entry point
//!
//! Hexagonal architecture, single control thread.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter   Esp32TimeAdapter│
//! │  (Sensor+Actuator) (EventSink)    (Config+NVS) (ClockPort)     │
//! │  SmsModem ──handler──▶ INBOX                                   │
//! │  (MessagingPort)                                               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              PumpService (pure logic)                  │    │
//! │  │  FSM · Start sequencer · Fail-safe · Monitors          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{self, UartDriver};
use esp_idf_hal::units::Hertz;
use log::{error, info, warn};

use firepump::adapters::hardware::HardwareAdapter;
use firepump::adapters::log_sink::LogEventSink;
use firepump::adapters::modem::{SmsModem, UartLink};
use firepump::adapters::nvs::NvsAdapter;
use firepump::adapters::time::Esp32TimeAdapter;
use firepump::app::commands::CommandRequest;
use firepump::app::dispatcher::dispatch;
use firepump::app::ports::{ClockPort, ConfigError, ConfigPort};
use firepump::app::service::PumpService;
use firepump::config::SystemConfig;
use firepump::drivers::watchdog::{Stage, Watchdog};
use firepump::{inbox, pins, sensors};

/// Re-read the network clock this often once synced.
const CLOCK_RESYNC_MS: u64 = 60 * 60 * 1000;
/// Outbound SMS attempted per loop iteration.
const SMS_PER_LOOP: usize = 3;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  FirePump v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    let mut hw = match HardwareAdapter::board() {
        Ok(hw) => hw,
        Err(e) => {
            // Relays stay released through the reboot.
            error!("Board bring-up failed: {}, restarting", e);
            esp_idf_hal::reset::restart();
        }
    };
    let watchdog = Watchdog::new();

    // ── 3. Config from NVS (or defaults) ──────────────────────
    let mut nvs = NvsAdapter::new().unwrap_or_else(|e| {
        warn!("NVS init failed ({}), running without persistence", e);
        NvsAdapter::detached()
    });
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(ConfigError::NotFound) => {
            info!("No stored config, using defaults");
            SystemConfig::default()
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 4. Modem ──────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio17,
        peripherals.pins.gpio18,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &uart::config::Config::default().baudrate(Hertz(pins::MODEM_BAUD)),
    )?;
    let mut modem = SmsModem::new(UartLink::new(uart));
    modem.register_handler(inbox::handler());
    if let Err(e) = modem.init() {
        // Keep running: local sensing and fail-safe do not need the modem.
        error!("Modem init failed: {}", e);
    }

    let mut clock = Esp32TimeAdapter::new();
    let mut log_sink = LogEventSink::new();

    // ── 5. App service ────────────────────────────────────────
    let loop_ms = config.control_loop_interval_ms;
    let sms_check_ms = u64::from(config.sms_check_interval_ms);

    let mut app = PumpService::new(config);
    app.restore(&nvs);
    app.start(&mut hw, &mut log_sink);

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    let mut last_sms_check: Option<u64> = None;
    let mut last_clock_sync: Option<u64> = None;

    loop {
        FreeRtos::delay_ms(loop_ms);
        let now = clock.now_ms();

        if last_sms_check.is_none_or(|t| now.saturating_sub(t) >= sms_check_ms) {
            last_sms_check = Some(now);
            modem.poll();
            match modem.query_signal() {
                Ok(rssi) => sensors::set_signal_strength(rssi),
                Err(e) => warn!("Signal query failed: {}", e),
            }
            if last_clock_sync.is_none_or(|t| now.saturating_sub(t) >= CLOCK_RESYNC_MS) {
                match modem.network_time() {
                    Ok(at) => {
                        clock.sync_wall_clock(at);
                        last_clock_sync = Some(now);
                    }
                    Err(e) => warn!("Network time unavailable: {}", e),
                }
            }
            watchdog.feed(Stage::Modem);
        }

        // Commands run to completion before the tick. Replies only queue.
        while let Some(sms) = inbox::INBOX.take() {
            let request = CommandRequest::new(&sms.sender, &sms.text);
            dispatch(
                &mut app,
                &request,
                clock.now_ms(),
                &mut hw,
                &mut modem,
                &mut nvs,
                &mut log_sink,
            );
            watchdog.feed(Stage::Command);
        }

        app.tick(&clock, &mut hw, &mut modem, &mut nvs, &mut log_sink);
        watchdog.feed(Stage::Tick);

        // Anything left waits for the next iteration.
        modem.flush(SMS_PER_LOOP, || watchdog.feed(Stage::Sms));
    }
}
