#![warn(clippy::pedantic)]

//! Access to the ENE KB3310 embedded controller found on Eee PC boards.
//!
//! The controller has a feature known as "Index IO" which exposes its whole
//! 64 KiB address space (ROM, RAM, SFRs and peripheral registers) through
//! three ISA ports. Going through the index registers bypasses the EC
//! firmware: a write takes about 90 µs, an ACPI EC transaction takes orders
//! of magnitude longer.

pub mod port_accessor;
pub mod dev_port;
pub mod indexed_io;
pub mod registers;
pub mod ports;
pub mod controller;
pub mod error;

pub use controller::EmbeddedController;
pub use error::Error;
pub use indexed_io::{IndexedIo, RegisterBus};
pub use ports::{FanDuty, FanPort, Thermometer, Voltage, VoltagePort};
