//! Layout of the CPU and PCI divisors inside the synthesizer's control block.
//!
//! ```text
//!   byte 11: N[1:0] M[5:0]
//!   byte 12: N[9:2]
//!   byte 15: ..     PCI[5:0]
//! ```
//!
//! Read as a little-endian word, bytes 11 and 12 hold M in the low six bits
//! and N in the remaining ten.

use proc_bitfield::bitfield;

use crate::error::Error;

pub const CPU_PLL_OFFSET: usize = 11;
pub const PCI_PLL_OFFSET: usize = 15;
pub const MIN_BLOCK_LEN: usize = PCI_PLL_OFFSET + 1;

bitfield! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct CpuPll(pub u16) {
        pub m: u8 @ 0..=5,
        pub n: u16 @ 6..=15
    }
}

bitfield! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct PciPll(pub u8) {
        pub divisor: u8 @ 0..=5
    }
}

/// One consistent setting of the synthesizer: CPU PLL `M`/`N` and the PCI divisor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Dividers {
    pub m: u8,
    pub n: u16,
    pub pci: u8
}

impl Dividers {
    pub const M_MAX: u8 = 0x3F;
    pub const N_MAX: u16 = 0x3FF;
    pub const PCI_MAX: u8 = 0x3F;

    /// # Errors
    ///
    /// Returns [`Error::InvalidDividers`] if a value doesn't fit its field or `m` is zero.
    pub fn new(m: u8, n: u16, pci: u8) -> Result<Self, Error> {
        let dividers = Self { m, n, pci };
        if dividers.is_encodable() {
            Ok(dividers)
        } else {
            Err(Error::InvalidDividers(dividers))
        }
    }

    #[must_use]
    pub fn is_encodable(&self) -> bool {
        (1..=Self::M_MAX).contains(&self.m)
            && self.n <= Self::N_MAX
            && self.pci <= Self::PCI_MAX
    }
}

impl std::fmt::Display for Dividers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M={} N={} PCI={}", self.m, self.n, self.pci)
    }
}

/// # Errors
///
/// Returns [`Error::ShortBlock`] if the block doesn't reach the PCI divisor byte.
pub fn decode(block: &[u8]) -> Result<Dividers, Error> {
    if block.len() < MIN_BLOCK_LEN {
        return Err(Error::ShortBlock(block.len()));
    }

    let cpu = CpuPll(u16::from_le_bytes([block[CPU_PLL_OFFSET], block[CPU_PLL_OFFSET + 1]]));
    let pci = PciPll(block[PCI_PLL_OFFSET]);

    Ok(Dividers {
        m: cpu.m(),
        n: cpu.n(),
        pci: pci.divisor()
    })
}

/// Patches the divisor bytes of `block` in place, everything else is left as is.
/// The reserved bits of the PCI byte are cleared.
///
/// # Errors
///
/// Returns an error if the block is too short or the dividers aren't encodable.
pub fn encode(dividers: Dividers, block: &mut [u8]) -> Result<(), Error> {
    if block.len() < MIN_BLOCK_LEN {
        return Err(Error::ShortBlock(block.len()));
    }

    if !dividers.is_encodable() {
        return Err(Error::InvalidDividers(dividers));
    }

    let cpu = CpuPll::default()
        .with_m(dividers.m)
        .with_n(dividers.n);

    let [low, high] = cpu.0.to_le_bytes();
    block[CPU_PLL_OFFSET] = low;
    block[CPU_PLL_OFFSET + 1] = high;
    block[PCI_PLL_OFFSET] = PciPll::default().with_divisor(dividers.pci).0;

    Ok(())
}
