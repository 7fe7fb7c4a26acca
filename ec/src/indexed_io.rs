use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{error::Error, port_accessor::PortAccessor};

/// Byte-wide access to the 16-bit EC address space.
pub trait RegisterBus {
    /// # Errors
    ///
    /// Returns an error in case of a failed port access.
    fn read(&self, address: u16) -> Result<u8, Error>;

    /// # Errors
    ///
    /// Returns an error in case of a failed port access.
    fn write(&self, address: u16, value: u8) -> Result<(), Error>;

    /// Read-modify-write without releasing the bus in between.
    /// Returns the value that has been written.
    ///
    /// # Errors
    ///
    /// Returns an error in case of a failed port access.
    fn update<F: FnOnce(u8) -> u8>(&self, address: u16, modify: F) -> Result<u8, Error>;
}

/// Index I/O: the address goes to two latch ports, the data byte moves
/// through the third one. The whole sequence must not interleave with another
/// access, so every operation holds the lock for its full duration.
pub struct IndexedIo<P: PortAccessor> {
    ports: Mutex<P>
}

impl<P: PortAccessor> IndexedIo<P> {
    pub const ADDRESS_HIGH_PORT: u16 = 0x381;
    pub const ADDRESS_LOW_PORT: u16 = 0x382;
    pub const DATA_PORT: u16 = 0x383;

    #[must_use]
    pub fn new(ports: P) -> Self {
        Self { ports: Mutex::new(ports) }
    }

    fn lock(&self) -> MutexGuard<'_, P> {
        self.ports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn select(ports: &P, address: u16) -> Result<(), Error> {
        let [high, low] = address.to_be_bytes();
        ports.write_byte(Self::ADDRESS_HIGH_PORT, high)?;
        ports.write_byte(Self::ADDRESS_LOW_PORT, low)
    }
}

impl<P: PortAccessor> RegisterBus for IndexedIo<P> {
    fn read(&self, address: u16) -> Result<u8, Error> {
        let ports = self.lock();
        Self::select(&ports, address)?;
        ports.read_byte(Self::DATA_PORT)
    }

    fn write(&self, address: u16, value: u8) -> Result<(), Error> {
        let ports = self.lock();
        Self::select(&ports, address)?;
        ports.write_byte(Self::DATA_PORT, value)
    }

    fn update<F: FnOnce(u8) -> u8>(&self, address: u16, modify: F) -> Result<u8, Error> {
        let ports = self.lock();
        Self::select(&ports, address)?;
        let value = modify(ports.read_byte(Self::DATA_PORT)?);

        Self::select(&ports, address)?;
        ports.write_byte(Self::DATA_PORT, value)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Emulates the index registers on top of a flat 64 KiB memory.
    struct FakeEcPorts {
        memory: RefCell<Vec<u8>>,
        address: RefCell<[u8; 2]>,
        log: RefCell<Vec<(u16, Option<u8>)>>
    }

    impl FakeEcPorts {
        fn new() -> Self {
            Self {
                memory: RefCell::new(vec![0; 0x1_0000]),
                address: RefCell::new([0; 2]),
                log: RefCell::new(Vec::new())
            }
        }

        fn selected(&self) -> usize {
            usize::from(u16::from_be_bytes(*self.address.borrow()))
        }
    }

    impl PortAccessor for FakeEcPorts {
        fn read_byte(&self, port_number: u16) -> Result<u8, Error> {
            self.log.borrow_mut().push((port_number, None));
            match port_number {
                0x383 => Ok(self.memory.borrow()[self.selected()]),
                _ => Err(Error::PortRead {
                    port: port_number,
                    source: std::io::Error::from(std::io::ErrorKind::Unsupported)
                })
            }
        }

        fn write_byte(&self, port_number: u16, value: u8) -> Result<(), Error> {
            self.log.borrow_mut().push((port_number, Some(value)));
            match port_number {
                0x381 => self.address.borrow_mut()[0] = value,
                0x382 => self.address.borrow_mut()[1] = value,
                0x383 => {
                    let selected = self.selected();
                    self.memory.borrow_mut()[selected] = value;
                }
                _ => unreachable!("unexpected port {port_number:#x}")
            }
            Ok(())
        }
    }

    #[test]
    fn write_then_read_goes_through_index_registers() {
        let bus = IndexedIo::new(FakeEcPorts::new());
        bus.write(0xF463, 55).unwrap();
        assert_eq!(bus.read(0xF463).unwrap(), 55);

        let ports = bus.lock();
        assert_eq!(
            ports.log.borrow()[..3],
            [(0x381, Some(0xF4)), (0x382, Some(0x63)), (0x383, Some(55))]
        );
    }

    #[test]
    fn update_keeps_untouched_bits() {
        let bus = IndexedIo::new(FakeEcPorts::new());
        bus.write(0xF4D3, 0b1000_0001).unwrap();

        let written = bus.update(0xF4D3, |value| value | 0b10).unwrap();

        assert_eq!(written, 0b1000_0011);
        assert_eq!(bus.read(0xF4D3).unwrap(), 0b1000_0011);
    }

    #[test]
    fn read_error_is_reported() {
        struct DeadPorts;

        impl PortAccessor for DeadPorts {
            fn read_byte(&self, port_number: u16) -> Result<u8, Error> {
                Err(Error::PortRead {
                    port: port_number,
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied)
                })
            }

            fn write_byte(&self, _port_number: u16, _value: u8) -> Result<(), Error> {
                Ok(())
            }
        }

        let bus = IndexedIo::new(DeadPorts);
        assert!(matches!(bus.read(0xF451), Err(Error::PortRead { port: 0x383, .. })));
    }
}
