//! Inbound SMS commands.
//!
//! The operator texts one word; matching is case-insensitive after
//! trimming. Anything else gets the usage hint.

use core::fmt;

/// Reply for unrecognised text.
pub const USAGE: &str = "Unknown command. Use: START, STOP, STATUS, RUNTIME, RESET, CLEARHOURS";

/// Commands an operator can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpCommand {
    Start,
    Stop,
    Status,
    Runtime,
    Reset,
    ClearHours,
    Unknown,
}

impl PumpCommand {
    /// Parse already-normalized text.
    pub fn parse(normalized: &str) -> Self {
        match normalized {
            "start" => Self::Start,
            "stop" => Self::Stop,
            "status" => Self::Status,
            "runtime" => Self::Runtime,
            "reset" => Self::Reset,
            "clearhours" => Self::ClearHours,
            _ => Self::Unknown,
        }
    }

    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Status => "status",
            Self::Runtime => "runtime",
            Self::Reset => "reset",
            Self::ClearHours => "clearhours",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PumpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Trim and lowercase raw message text.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One inbound message, normalized and parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub originator: String,
    pub text: String,
    pub command: PumpCommand,
}

impl CommandRequest {
    pub fn new(originator: &str, raw_text: &str) -> Self {
        let text = normalize(raw_text);
        let command = PumpCommand::parse(&text);
        Self {
            originator: originator.trim().to_string(),
            text,
            command,
        }
    }
}

/// Why a command was not carried out. Replies, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AlreadyRunning,
    StartInProgress,
    NotRunning,
    NoFault,
}

impl Rejection {
    pub const fn reply(self) -> &'static str {
        match self {
            Self::AlreadyRunning => "Pump already running",
            Self::StartInProgress => "Start already in progress",
            Self::NotRunning => "Pump not running",
            Self::NoFault => "No fault to reset",
        }
    }
}
