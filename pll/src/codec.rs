use std::num::NonZeroU32;

pub type Mhz = u32;

///
/// The ICS9LPR426A synthesizes the CPU clock from a fixed reference:
///   f_VCO(MHz) = PllConst * N / M
///   f_CPU(MHz) = f_VCO * CpuMul
///
/// As follows:
///   N = f_CPU * M / (PllConst * CpuMul)
///
/// Where:
///   PllConst = 24 on the reference board (the crystal frequency)
///   CpuMul   = board calibration factor, 8 on the reference board
///   M        = CPU PLL divisor, never zero
///   N        = CPU PLL numerator
///
/// Both directions use integer floor division, so converting a frequency to N
/// and back lands on the nearest achievable frequency at or below the request.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockCodec {
    pll_const: NonZeroU32,
    cpu_mul: NonZeroU32
}

const fn non_zero(value: u32) -> NonZeroU32 {
    match NonZeroU32::new(value) {
        Some(value) => value,
        None => panic!("calibration factors must be non-zero")
    }
}

impl ClockCodec {
    pub const REFERENCE: Self = Self {
        pll_const: non_zero(24),
        cpu_mul: non_zero(8)
    };

    /// Returns `None` if any of the factors is zero.
    #[must_use]
    pub fn new(pll_const: u32, cpu_mul: u32) -> Option<Self> {
        Some(Self {
            pll_const: NonZeroU32::new(pll_const)?,
            cpu_mul: NonZeroU32::new(cpu_mul)?
        })
    }

    #[must_use]
    pub fn pll_const(&self) -> u32 {
        self.pll_const.get()
    }

    #[must_use]
    pub fn cpu_mul(&self) -> u32 {
        self.cpu_mul.get()
    }

    fn ratio(self) -> u64 {
        u64::from(self.pll_const.get()) * u64::from(self.cpu_mul.get())
    }

    /// N giving the highest frequency not above `freq_mhz` for the divisor `m`.
    #[must_use]
    pub fn to_dividers(&self, freq_mhz: Mhz, m: u8) -> u16 {
        let n = u64::from(freq_mhz) * u64::from(m) / self.ratio();
        u16::try_from(n).unwrap_or(u16::MAX)
    }

    /// Effective CPU frequency, zero for a zero divisor.
    #[must_use]
    pub fn to_frequency(&self, m: u8, n: u16) -> Mhz {
        if m == 0 {
            return 0;
        }

        let freq = u64::from(n) * self.ratio() / u64::from(m);
        Mhz::try_from(freq).unwrap_or(Mhz::MAX)
    }
}

impl Default for ClockCodec {
    fn default() -> Self {
        Self::REFERENCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_calibration() {
        let codec = ClockCodec::default();
        assert_eq!(codec.pll_const(), 24);
        assert_eq!(codec.cpu_mul(), 8);

        assert_eq!(codec.to_dividers(1600, 50), 416);
        assert_eq!(codec.to_frequency(50, 462), 1774);
        assert_eq!(codec.to_frequency(49, 462), 1810);
    }

    #[test]
    fn round_trip_rounds_down() {
        let codec = ClockCodec::default();
        for freq in [900, 1000, 1333, 1600, 1700, 1774] {
            let n = codec.to_dividers(freq, 50);
            let back = codec.to_frequency(50, n);
            assert!(back <= freq, "{freq} -> {n} -> {back}");
            assert!(freq - back <= 4, "{freq} -> {n} -> {back}");
        }
    }

    #[test]
    fn degenerate_inputs() {
        assert!(ClockCodec::new(0, 8).is_none());
        assert!(ClockCodec::new(24, 0).is_none());

        let codec = ClockCodec::new(24, 8).unwrap();
        assert_eq!(codec, ClockCodec::default());
        assert_eq!(codec.to_frequency(0, 420), 0);
        assert_eq!(codec.to_dividers(u32::MAX, 63), u16::MAX);
    }
}
