use std::{
    fs::{self, File, OpenOptions},
    os::fd::AsRawFd,
    path::Path
};

use log::info;

use crate::error::Error;

/// `I2C_SMBUS_BLOCK_MAX`: the longest SMBus block transfer.
pub const BLOCK_MAX: usize = 32;

pub trait BlockTransfer {
    /// Reads a block into `block`, returns the number of bytes the device sent.
    ///
    /// # Errors
    ///
    /// Returns an error in case of a failed bus transaction.
    fn read_block(&self, command: u8, block: &mut [u8; BLOCK_MAX]) -> Result<usize, Error>;

    /// # Errors
    ///
    /// Returns an error in case of a failed bus transaction.
    fn write_block(&self, command: u8, data: &[u8]) -> Result<(), Error>;
}

const I2C_SLAVE: libc::Ioctl = 0x0703;
const I2C_SMBUS: libc::Ioctl = 0x0720;
const I2C_SMBUS_READ: u8 = 1;
const I2C_SMBUS_WRITE: u8 = 0;
const I2C_SMBUS_BLOCK_DATA: u32 = 5;

// union i2c_smbus_data, block flavour: block[0] holds the length.
#[repr(C)]
struct SmbusData {
    block: [u8; BLOCK_MAX + 2]
}

// struct i2c_smbus_ioctl_data
#[repr(C)]
struct SmbusIoctlData {
    read_write: u8,
    command: u8,
    size: u32,
    data: *mut SmbusData
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adapter {
    pub number: u32,
    pub name: String
}

/// A client on a Linux i2c-dev adapter (`/dev/i2c-N`).
pub struct SmbusDevice {
    file: File,
    adapter: Adapter,
    address: u16
}

impl SmbusDevice {
    pub const SYSFS_ADAPTERS: &'static str = "/sys/class/i2c-adapter";

    /// Looks for the lowest-numbered adapter whose name contains `name_fragment`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BusUnavailable`] if no adapter matches.
    pub fn find_adapter(sysfs_root: impl AsRef<Path>, name_fragment: &str) -> Result<Adapter, Error> {
        let entries = fs::read_dir(sysfs_root.as_ref())
            .map_err(|err| Error::BusUnavailable(format!("{}: {err}", sysfs_root.as_ref().display())))?;

        let mut found: Option<Adapter> = None;
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(number) = file_name
                .to_str()
                .and_then(|name| name.strip_prefix("i2c-"))
                .and_then(|number| number.parse::<u32>().ok())
            else {
                continue;
            };

            let Ok(name) = fs::read_to_string(entry.path().join("name")) else {
                continue;
            };

            let name = name.trim();
            if name.contains(name_fragment) && found.as_ref().map_or(true, |best| number < best.number) {
                found = Some(Adapter { number, name: name.to_string() });
            }
        }

        found.ok_or_else(|| Error::BusUnavailable(format!("no adapter named like \"{name_fragment}\"")))
    }

    /// # Errors
    ///
    /// Returns an error if the adapter node can't be opened or doesn't accept the client address.
    pub fn open(adapter: Adapter, address: u16) -> Result<Self, Error> {
        let path = format!("/dev/i2c-{}", adapter.number);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(Error::Open)?;

        // SAFETY: I2C_SLAVE takes the client address by value.
        let status = unsafe { libc::ioctl(file.as_raw_fd(), I2C_SLAVE, libc::c_ulong::from(address)) };
        if status < 0 {
            return Err(Error::Open(std::io::Error::last_os_error()));
        }

        info!("Found SMBus adapter {} ({path}), client {address:#04x}", adapter.name);
        Ok(Self { file, adapter, address })
    }

    #[must_use]
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    #[must_use]
    pub fn address(&self) -> u16 {
        self.address
    }

    fn transfer(&self, read_write: u8, command: u8, data: &mut SmbusData) -> Result<(), Error> {
        let mut request = SmbusIoctlData {
            read_write,
            command,
            size: I2C_SMBUS_BLOCK_DATA,
            data: std::ptr::addr_of_mut!(*data)
        };

        // SAFETY: `request` and the buffer it points to outlive the call.
        let status = unsafe {
            libc::ioctl(self.file.as_raw_fd(), I2C_SMBUS, std::ptr::addr_of_mut!(request))
        };

        if status < 0 {
            Err(Error::Transaction(std::io::Error::last_os_error()))
        } else {
            Ok(())
        }
    }
}

impl BlockTransfer for SmbusDevice {
    fn read_block(&self, command: u8, block: &mut [u8; BLOCK_MAX]) -> Result<usize, Error> {
        let mut data = SmbusData { block: [0; BLOCK_MAX + 2] };
        self.transfer(I2C_SMBUS_READ, command, &mut data)?;

        let len = usize::from(data.block[0]).min(BLOCK_MAX);
        block.fill(0);
        block[..len].copy_from_slice(&data.block[1..=len]);
        Ok(len)
    }

    fn write_block(&self, command: u8, payload: &[u8]) -> Result<(), Error> {
        let len = payload.len().min(BLOCK_MAX);
        let mut data = SmbusData { block: [0; BLOCK_MAX + 2] };

        #[allow(clippy::cast_possible_truncation)]
        {
            data.block[0] = len as u8;
        }
        data.block[1..=len].copy_from_slice(&payload[..len]);

        self.transfer(I2C_SMBUS_WRITE, command, &mut data)
    }
}
