//! Inbound SMS queue between the modem and the control loop.
//!
//! ```text
//!   SmsModem::poll ──handler()──▶ INBOX (Channel, depth 8) ──take()──▶ dispatcher
//! ```
//!
//! The modem adapter calls the registered handler for every `+CMT`
//! message and returns straight away; the control loop drains the inbox
//! at the tick boundary, so a command never interleaves with a tick.
//!
//! Uses [`CriticalSectionRawMutex`] so pushes are safe from any task.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

/// Queue depth; messages beyond this are dropped with a warning.
pub const INBOX_DEPTH: usize = 8;
/// Longest sender address kept.
pub const SENDER_CAPACITY: usize = 24;
/// One SMS in GSM 7-bit text mode.
pub const TEXT_CAPACITY: usize = 160;

/// Signature of the inbound message handler given to the modem.
pub type MessageHandler = fn(sender: &str, text: &str);

/// One received text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundSms {
    pub sender: heapless::String<SENDER_CAPACITY>,
    pub text: heapless::String<TEXT_CAPACITY>,
}

impl InboundSms {
    /// Copy `sender` and `text`, truncating at the capacities.
    pub fn new(sender: &str, text: &str) -> Self {
        Self {
            sender: truncated(sender),
            text: truncated(text),
        }
    }
}

pub(crate) fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Bounded queue of received messages.
pub struct CommandInbox {
    channel: Channel<CriticalSectionRawMutex, InboundSms, INBOX_DEPTH>,
}

impl Default for CommandInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandInbox {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Queue a message. Returns `false` (and logs) when the inbox is full.
    pub fn deliver(&self, sender: &str, text: &str) -> bool {
        match self.channel.try_send(InboundSms::new(sender, text)) {
            Ok(()) => true,
            Err(_) => {
                warn!("Command inbox full, dropped SMS from {}", sender);
                false
            }
        }
    }

    /// Next queued message, if any.
    pub fn take(&self) -> Option<InboundSms> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

/// The firmware's inbox, fed by [`handler`].
pub static INBOX: CommandInbox = CommandInbox::new();

fn deliver_to_inbox(sender: &str, text: &str) {
    INBOX.deliver(sender, text);
}

/// Handler to register with the modem once at startup.
pub fn handler() -> MessageHandler {
    deliver_to_inbox
}
