use std::{
    fs::{File, OpenOptions},
    os::unix::fs::FileExt,
    path::Path
};

use crate::{error::Error, port_accessor::PortAccessor};

/// Port I/O through the `/dev/port` character device.
///
/// Every byte offset of the device maps onto the I/O port with the same number,
/// so a positioned one-byte read or write is an `inb`/`outb`.
pub struct DevPort {
    file: File
}

impl DevPort {
    pub const DEFAULT_PATH: &'static str = "/dev/port";

    /// # Errors
    ///
    /// Returns an error if the device can't be opened for reading and writing
    /// (usually missing root privileges).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(Error::Open)?;

        Ok(Self { file })
    }
}

impl PortAccessor for DevPort {
    fn read_byte(&self, port_number: u16) -> Result<u8, Error> {
        let mut value = [0_u8; 1];
        self.file
            .read_exact_at(&mut value, u64::from(port_number))
            .map_err(|source| Error::PortRead { port: port_number, source })?;
        Ok(value[0])
    }

    fn write_byte(&self, port_number: u16, value: u8) -> Result<(), Error> {
        self.file
            .write_all_at(&[value], u64::from(port_number))
            .map_err(|source| Error::PortWrite { port: port_number, source })
    }
}
