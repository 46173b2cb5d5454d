//! Fuzz target: modem response parsers
//!
//! Arbitrary lines from the UART must never panic the `+CMT`, `+CSQ` or
//! `+CCLK` parsers, and whatever they return must be in range.
//!
//! cargo fuzz run fuzz_modem_lines

#![no_main]

use chrono::Datelike;
use firepump::adapters::modem::{parse_cclk, parse_cmt_sender, parse_csq};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);

    if let Some(sender) = parse_cmt_sender(&line) {
        assert!(line.contains(sender));
    }
    if let Some(rssi) = parse_csq(&line) {
        assert!((0..=31).contains(&rssi) || rssi == 99);
    }
    if let Some(at) = parse_cclk(&line) {
        assert!(at.year() >= 2020);
    }
});
