//! KB3310 address map as used on the Eee PC 900/901/1000 series.

use proc_bitfield::bitfield;

pub const TEMPERATURE: u16 = 0xF451;   // ST00: CPU temperature, °C
pub const FAN_DUTY: u16 = 0xF463;      // SC02: fan PWM duty cycle, %
pub const FAN_RPM_HIGH: u16 = 0xF466;  // SC05
pub const FAN_RPM_LOW: u16 = 0xF467;   // SC06
pub const FAN_FLAGS: u16 = 0xF4D3;     // SFB3, holds SF25

pub const GPIO_BASE: u16 = 0xFC20;

/// GPIO driving the core voltage selector of the CPU regulator.
pub const VOLTAGE_PIN: GpioPin = GpioPin(0x66);

bitfield! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct FanFlags(pub u8) {
        pub manual: bool @ 1 // SF25: the EC firmware leaves the fan alone
    }
}

/// GPIO lines are packed eight per register starting at [`GPIO_BASE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioPin(pub u8);

impl GpioPin {
    #[must_use]
    pub fn register(self) -> u16 {
        GPIO_BASE + u16::from((self.0 >> 3) & 0x1F)
    }

    #[must_use]
    pub fn mask(self) -> u8 {
        1 << (self.0 & 0x07)
    }
}
