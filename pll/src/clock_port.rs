use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, trace};

use crate::{
    control::{self, Dividers},
    error::Error,
    smbus::{BlockTransfer, BLOCK_MAX}
};

pub trait ClockPort {
    /// Reads the divisors currently programmed into the synthesizer.
    ///
    /// # Errors
    ///
    /// Returns an error in case of a failed bus transaction or a malformed block.
    fn read(&self) -> Result<Dividers, Error>;

    /// Programs the divisors. Does nothing if the synthesizer already runs with them.
    ///
    /// # Errors
    ///
    /// Returns an error in case of a failed bus transaction or unencodable dividers.
    fn write(&self, dividers: Dividers) -> Result<(), Error>;
}

impl<T: ClockPort + ?Sized> ClockPort for Arc<T> {
    fn read(&self) -> Result<Dividers, Error> {
        (**self).read()
    }

    fn write(&self, dividers: Dividers) -> Result<(), Error> {
        (**self).write(dividers)
    }
}

struct ControlBlock {
    bytes: [u8; BLOCK_MAX],
    len: usize
}

impl ControlBlock {
    fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// ICS9LPR426A clock synthesizer.
///
/// Keeps the last control block read from the chip: a write patches the
/// divisor bytes of the freshly read block and sends it back whole.
pub struct Pll<Bus: BlockTransfer> {
    bus: Bus,
    block: Mutex<ControlBlock>
}

impl<Bus: BlockTransfer> Pll<Bus> {
    pub const ADDRESS: u16 = 0x69;
    pub const COMMAND: u8 = 0;

    /// # Errors
    ///
    /// Returns an error if the initial control block can't be read or is too short.
    pub fn new(bus: Bus) -> Result<Self, Error> {
        let pll = Self {
            bus,
            block: Mutex::new(ControlBlock { bytes: [0; BLOCK_MAX], len: 0 })
        };

        let dividers = pll.read()?;
        debug!("PLL is running with {dividers}");
        Ok(pll)
    }

    #[must_use]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    fn refresh(&self, block: &mut ControlBlock) -> Result<Dividers, Error> {
        block.len = self.bus.read_block(Self::COMMAND, &mut block.bytes)?;
        control::decode(block.as_slice())
    }
}

impl<Bus: BlockTransfer> ClockPort for Pll<Bus> {
    fn read(&self) -> Result<Dividers, Error> {
        let mut block = self.block.lock().unwrap_or_else(PoisonError::into_inner);
        self.refresh(&mut block)
    }

    fn write(&self, dividers: Dividers) -> Result<(), Error> {
        if !dividers.is_encodable() {
            return Err(Error::InvalidDividers(dividers));
        }

        let mut block = self.block.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.refresh(&mut block)?;
        if current == dividers {
            trace!("PLL already runs with {dividers}");
            return Ok(());
        }

        let len = block.len;
        control::encode(dividers, &mut block.bytes[..len])?;
        self.bus.write_block(Self::COMMAND, block.as_slice())?;
        trace!("PLL reprogrammed: {current} -> {dividers}");
        Ok(())
    }
}
