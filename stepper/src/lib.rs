#![warn(clippy::pedantic)]

//! Moves the CPU clock to a requested frequency one small PLL step at a time.
//!
//! A step changes the PLL numerator N by a few units per timer tick; the divisor M
//! is only switched at points where the resulting frequency stays inside the
//! validated window. Entering the overclock regime forces the fan up, leaving it
//! gives the fan back to the embedded controller. Core voltage follows the
//! effective frequency on every tick.

pub mod calibration;
pub mod fan_memory;
pub mod scheduler;
pub mod controller;
pub mod error;

#[cfg(test)]
mod testing;

pub use calibration::{Calibration, NWindow, Regime};
pub use controller::{ClockState, Ports, State, Status, StepController};
pub use error::{Error, Source};
pub use fan_memory::FanMemory;
pub use scheduler::{Scheduler, Task, TaskHandle, TimerScheduler};
