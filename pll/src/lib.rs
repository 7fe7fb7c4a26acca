#![warn(clippy::pedantic)]

pub mod codec;
pub mod control;
pub mod clock_port;
pub mod smbus;
pub mod error;

pub use clock_port::{ClockPort, Pll};
pub use codec::{ClockCodec, Mhz};
pub use control::Dividers;
pub use error::Error;
pub use smbus::{Adapter, BlockTransfer, SmbusDevice};
