//! Background monitors evaluated once per control tick.
//!
//! Each monitor is pure logic over values the service hands it and returns
//! the alerts it wants sent; the service owns delivery and persistence.

pub mod battery;
pub mod service;
pub mod weekly;
