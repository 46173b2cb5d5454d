//! Fuzz target: `CommandRequest::new`
//!
//! Feeds arbitrary SMS bodies and senders through command normalisation and
//! checks that the parsed command only depends on the normalised text.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use firepump::app::commands::{normalize, CommandRequest, PumpCommand};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (sender, body) = text.split_once('\n').unwrap_or(("+1", text));

    let request = CommandRequest::new(sender, body);
    assert_eq!(request.originator, sender.trim());
    assert_eq!(request.command, PumpCommand::parse(&normalize(body)));
    if request.command != PumpCommand::Unknown {
        assert_eq!(request.text, request.command.keyword());
    }
});
