//! GSM modem adapter (SIM800-class, AT command set, SMS text mode).
//!
//! Implements [`MessagingPort`] for outbound SMS and feeds inbound `+CMT`
//! notifications to a handler registered once at startup.
//!
//! `send` only queues. The control loop calls [`SmsModem::flush`] after the
//! tick, which sends a bounded number of queued messages and runs a callback
//! (the watchdog feed) after each one.
//!
//! ```text
//!   UART ──bytes──▶ line buffer ──▶ handle_line ──+CMT──▶ pending sender
//!                                        │                    │
//!                                        │              next line = body
//!                                        ▼                    ▼
//!                                  command replies     handler(sender, body)
//! ```
//!
//! The byte transport is abstracted behind [`ModemLink`] so the protocol
//! logic runs against a scripted link on host. Every exchange has a total
//! deadline measured on the link's clock, so a modem that trickles bytes
//! cannot hold the loop longer than a silent one.

use chrono::{Datelike, NaiveDateTime};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};

use crate::app::ports::MessagingPort;
use crate::error::CommsError;
use crate::inbox::{MessageHandler, SENDER_CAPACITY, truncated};

/// Byte-level transport to the modem.
pub trait ModemLink {
    fn write(&mut self, data: &[u8]) -> Result<(), CommsError>;

    /// Next byte, or `Ok(None)` when nothing arrived within `timeout_ms`.
    fn read_byte(&mut self, timeout_ms: u32) -> Result<Option<u8>, CommsError>;

    /// Monotonic milliseconds, used for exchange deadlines.
    fn now_ms(&self) -> u64;
}

/// Whole exchange for a plain command.
pub const COMMAND_TIMEOUT_MS: u32 = 1_000;
/// Whole `AT+CMGS` exchange: prompt, body and network acceptance.
pub const SEND_TIMEOUT_MS: u32 = 10_000;
/// Idle gap that ends an inbound poll.
const POLL_TIMEOUT_MS: u32 = 20;
/// Upper bound on one inbound poll.
pub const POLL_BUDGET_MS: u32 = 2_000;
/// Outbound messages waiting for [`SmsModem::flush`].
pub const OUTBOX_DEPTH: usize = 12;
/// Longest outbound text kept. The weekly report fits.
pub const OUT_TEXT_CAPACITY: usize = 320;
/// Upper bound on lines consumed per poll.
const POLL_MAX_LINES: usize = 32;
const LINE_CAPACITY: usize = 256;
const CTRL_Z: u8 = 0x1A;
const ESC: u8 = 0x1B;

/// Extract the originating address from a `+CMT:` header.
///
/// `+CMT: "+15551234567","","24/07/01,09:00:00+00"` → `+15551234567`
pub fn parse_cmt_sender(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("+CMT:")?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    let sender = &rest[..end];
    (!sender.is_empty()).then_some(sender)
}

/// RSSI index from `+CSQ: <rssi>,<ber>` (0-31, or 99 for unknown).
pub fn parse_csq(line: &str) -> Option<i32> {
    let rest = line.strip_prefix("+CSQ:")?;
    let rssi: i32 = rest.split(',').next()?.trim().parse().ok()?;
    ((0..=31).contains(&rssi) || rssi == 99).then_some(rssi)
}

/// Local time from `+CCLK: "yy/MM/dd,hh:mm:ss±zz"`.
///
/// The modem reports local time; the zone suffix is ignored. Years before
/// 2020 mean the network has not set the clock yet.
pub fn parse_cclk(line: &str) -> Option<NaiveDateTime> {
    let rest = line.strip_prefix("+CCLK:")?.trim();
    let rest = rest.strip_prefix('"')?;
    let stamp = rest.get(..17)?;
    let at = NaiveDateTime::parse_from_str(stamp, "%y/%m/%d,%H:%M:%S").ok()?;
    (at.year() >= 2020).then_some(at)
}

/// Drop bytes that would end or abort a text-mode message early.
fn sms_safe(text: &str) -> impl Iterator<Item = u8> + '_ {
    text.bytes().filter(|b| *b != CTRL_Z && *b != ESC)
}

/// One reply line or the `>` send prompt.
enum Reply {
    Line(String),
    Prompt,
}

/// A message queued by [`MessagingPort::send`].
struct OutboundSms {
    address: heapless::String<SENDER_CAPACITY>,
    text: heapless::String<OUT_TEXT_CAPACITY>,
}

/// SMS modem speaking the AT command set over a [`ModemLink`].
pub struct SmsModem<L: ModemLink> {
    link: L,
    line: heapless::Vec<u8, LINE_CAPACITY>,
    handler: Option<MessageHandler>,
    /// Sender of a `+CMT` header whose body line has not arrived yet.
    pending_sender: Option<heapless::String<SENDER_CAPACITY>>,
    /// Set while `AT+CMGS` waits for `>`; a leading `>` is text otherwise.
    awaiting_prompt: bool,
    outbox: Channel<NoopRawMutex, OutboundSms, OUTBOX_DEPTH>,
}

impl<L: ModemLink> SmsModem<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            line: heapless::Vec::new(),
            handler: None,
            pending_sender: None,
            awaiting_prompt: false,
            outbox: Channel::new(),
        }
    }

    /// Register the inbound message handler. Only the first call counts.
    pub fn register_handler(&mut self, handler: MessageHandler) {
        if self.handler.is_some() {
            warn!("Modem: inbound handler already registered, ignoring");
            return;
        }
        self.handler = Some(handler);
    }

    /// Put the modem into SMS text mode with direct `+CMT` delivery.
    pub fn init(&mut self) -> Result<(), CommsError> {
        for cmd in ["AT", "ATE0", "AT+CMGF=1", "AT+CNMI=2,2,0,0,0"] {
            self.command(cmd, None, COMMAND_TIMEOUT_MS)?;
        }
        info!("Modem: text mode ready");
        Ok(())
    }

    /// Consume any unsolicited output. Returns the number of SMS delivered.
    pub fn poll(&mut self) -> usize {
        let deadline = self.deadline(POLL_BUDGET_MS);
        let mut delivered = 0;
        for _ in 0..POLL_MAX_LINES {
            match self.next_reply(POLL_TIMEOUT_MS, deadline) {
                Ok(Some(Reply::Line(line))) => {
                    if self.handle_line(&line) {
                        delivered += 1;
                    }
                }
                Ok(Some(Reply::Prompt)) => {}
                Ok(None) => break,
                Err(e) => {
                    warn!("Modem: poll read failed: {}", e);
                    break;
                }
            }
        }
        delivered
    }

    /// Signal quality as the raw `AT+CSQ` RSSI index.
    pub fn query_signal(&mut self) -> Result<i32, CommsError> {
        let reply = self.command("AT+CSQ", Some("+CSQ:"), COMMAND_TIMEOUT_MS)?;
        reply
            .as_deref()
            .and_then(parse_csq)
            .ok_or(CommsError::Malformed)
    }

    /// Local time as held by the modem's network-synced clock.
    pub fn network_time(&mut self) -> Result<NaiveDateTime, CommsError> {
        let reply = self.command("AT+CCLK?", Some("+CCLK:"), COMMAND_TIMEOUT_MS)?;
        reply
            .as_deref()
            .and_then(parse_cclk)
            .ok_or(CommsError::Malformed)
    }

    /// Messages queued and not yet flushed.
    pub fn queued(&self) -> usize {
        self.outbox.len()
    }

    /// Send up to `budget` queued messages, calling `between` after each
    /// attempt. Failed messages are logged and dropped. Returns the number
    /// the network accepted.
    pub fn flush(&mut self, budget: usize, mut between: impl FnMut()) -> usize {
        let mut sent = 0;
        for _ in 0..budget {
            let Ok(sms) = self.outbox.try_receive() else {
                break;
            };
            match self.send_sms(&sms.address, &sms.text) {
                Ok(()) => {
                    info!("SMS -> {} ({} chars)", sms.address, sms.text.chars().count());
                    sent += 1;
                }
                Err(e) => warn!("SMS -> {} failed: {}", sms.address, e),
            }
            between();
        }
        sent
    }

    /// Send one text message and wait for the network to accept it.
    ///
    /// Blocks for at most [`SEND_TIMEOUT_MS`].
    pub fn send_sms(&mut self, address: &str, text: &str) -> Result<(), CommsError> {
        let deadline = self.deadline(SEND_TIMEOUT_MS);
        let header = format!("AT+CMGS=\"{}\"\r", address);
        self.link.write(header.as_bytes())?;

        self.awaiting_prompt = true;
        let prompt = self.await_prompt(deadline);
        self.awaiting_prompt = false;
        prompt?;

        let body: Vec<u8> = sms_safe(text).chain(core::iter::once(CTRL_Z)).collect();
        self.link.write(&body)?;
        self.await_final(None, SEND_TIMEOUT_MS, deadline).map(|_| ())
    }

    fn await_prompt(&mut self, deadline: u64) -> Result<(), CommsError> {
        loop {
            match self.next_reply(SEND_TIMEOUT_MS, deadline)? {
                Some(Reply::Prompt) => return Ok(()),
                Some(Reply::Line(line)) => {
                    if self.pending_sender.is_none() && is_error(&line) {
                        return Err(CommsError::Rejected);
                    }
                    self.handle_line(&line);
                }
                None => return Err(CommsError::Timeout),
            }
        }
    }

    /// Write `cmd` and collect the first line starting with `capture`.
    fn command(
        &mut self,
        cmd: &str,
        capture: Option<&str>,
        timeout_ms: u32,
    ) -> Result<Option<String>, CommsError> {
        let deadline = self.deadline(timeout_ms);
        self.link.write(cmd.as_bytes())?;
        self.link.write(b"\r")?;
        self.await_final(capture, timeout_ms, deadline)
    }

    fn deadline(&self, budget_ms: u32) -> u64 {
        self.link.now_ms().saturating_add(u64::from(budget_ms))
    }

    /// Read until `OK` or an error result, routing unsolicited lines.
    fn await_final(
        &mut self,
        capture: Option<&str>,
        idle_ms: u32,
        deadline: u64,
    ) -> Result<Option<String>, CommsError> {
        let mut captured = None;
        loop {
            let line = match self.next_reply(idle_ms, deadline)? {
                Some(Reply::Line(line)) => line,
                Some(Reply::Prompt) => continue,
                None => return Err(CommsError::Timeout),
            };
            if self.pending_sender.is_some() {
                self.handle_line(&line);
                continue;
            }
            if line == "OK" {
                return Ok(captured);
            }
            if is_error(&line) {
                debug!("Modem: {}", line);
                return Err(CommsError::Rejected);
            }
            if captured.is_none() && capture.is_some_and(|p| line.starts_with(p)) {
                captured = Some(line);
                continue;
            }
            // Command echo (if ATE0 has not taken effect yet).
            if line.starts_with("AT") {
                continue;
            }
            self.handle_line(&line);
        }
    }

    /// Handle one unsolicited line. Returns `true` if an SMS was delivered.
    fn handle_line(&mut self, line: &str) -> bool {
        if let Some(sender) = self.pending_sender.take() {
            match self.handler {
                Some(handler) => {
                    handler(sender.as_str(), line);
                    return true;
                }
                None => {
                    warn!("Modem: SMS from {} dropped, no handler", sender);
                    return false;
                }
            }
        }

        if line.starts_with("+CMT:") {
            match parse_cmt_sender(line) {
                Some(sender) => {
                    let mut s = heapless::String::new();
                    for c in sender.chars() {
                        if s.push(c).is_err() {
                            break;
                        }
                    }
                    self.pending_sender = Some(s);
                }
                None => warn!("Modem: unparseable CMT header: {}", line),
            }
        } else {
            debug!("Modem: unsolicited '{}'", line);
        }
        false
    }

    /// Next complete non-empty line, or the `>` prompt while one is awaited.
    ///
    /// `None` when `idle_ms` passes without a byte or `deadline` is reached.
    fn next_reply(&mut self, idle_ms: u32, deadline: u64) -> Result<Option<Reply>, CommsError> {
        loop {
            let remaining = deadline.saturating_sub(self.link.now_ms());
            if remaining == 0 {
                return Ok(None);
            }
            let wait = u32::try_from(remaining).map_or(idle_ms, |r| r.min(idle_ms));
            let Some(byte) = self.link.read_byte(wait)? else {
                return Ok(None);
            };
            match byte {
                b'\r' => {}
                b'\n' => {
                    if self.line.is_empty() {
                        continue;
                    }
                    let line = core::str::from_utf8(&self.line)
                        .map(|s| s.trim().to_owned())
                        .map_err(|_| CommsError::Malformed);
                    self.line.clear();
                    match line {
                        Ok(line) if line.is_empty() => {}
                        Ok(line) => return Ok(Some(Reply::Line(line))),
                        Err(_) => warn!("Modem: dropped non-UTF-8 line"),
                    }
                }
                b'>' if self.awaiting_prompt && self.line.is_empty() => {
                    return Ok(Some(Reply::Prompt));
                }
                other => {
                    if self.line.push(other).is_err() {
                        warn!("Modem: line overflow, discarding");
                        self.line.clear();
                    }
                }
            }
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}

fn is_error(line: &str) -> bool {
    line == "ERROR" || line.starts_with("+CMS ERROR") || line.starts_with("+CME ERROR")
}

impl<L: ModemLink> MessagingPort for SmsModem<L> {
    /// Queue for the next [`flush`](SmsModem::flush). Never touches the UART.
    fn send(&mut self, address: &str, text: &str) {
        let sms = OutboundSms {
            address: truncated(address),
            text: truncated(text),
        };
        if self.outbox.try_send(sms).is_err() {
            warn!("SMS outbox full, dropped message to {}", address);
        }
    }
}

// ── UART link (ESP32) ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use uart::UartLink;

#[cfg(target_os = "espidf")]
mod uart {
    use esp_idf_hal::delay::TickType;
    use esp_idf_hal::uart::UartDriver;

    use super::ModemLink;
    use crate::error::CommsError;

    /// Modem link over an ESP-IDF UART driver.
    pub struct UartLink<'d> {
        uart: UartDriver<'d>,
    }

    impl<'d> UartLink<'d> {
        pub fn new(uart: UartDriver<'d>) -> Self {
            Self { uart }
        }
    }

    impl ModemLink for UartLink<'_> {
        fn write(&mut self, data: &[u8]) -> Result<(), CommsError> {
            self.uart
                .write(data)
                .map(|_| ())
                .map_err(|_| CommsError::WriteFailed)
        }

        fn read_byte(&mut self, timeout_ms: u32) -> Result<Option<u8>, CommsError> {
            let mut buf = [0u8];
            let ticks = TickType::new_millis(u64::from(timeout_ms)).ticks();
            match self.uart.read(&mut buf, ticks) {
                Ok(0) => Ok(None),
                Ok(_) => Ok(Some(buf[0])),
                Err(_) => Err(CommsError::ReadFailed),
            }
        }

        fn now_ms(&self) -> u64 {
            (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
        }
    }
}
