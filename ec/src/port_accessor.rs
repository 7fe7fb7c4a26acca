use crate::error::Error;

pub trait PortAccessor {
    /// # Errors
    ///
    /// Returns an error if the port can't be read.
    fn read_byte(&self, port_number: u16) -> Result<u8, Error>;

    /// # Errors
    ///
    /// Returns an error if the port can't be written.
    fn write_byte(&self, port_number: u16, value: u8) -> Result<(), Error>;
}
