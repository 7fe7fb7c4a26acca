use log::debug;

use crate::{
    error::Error,
    indexed_io::RegisterBus,
    ports::{FanDuty, FanPort, Thermometer, Voltage, VoltagePort},
    registers::{self, FanFlags, GpioPin}
};

pub struct EmbeddedController<Bus: RegisterBus> {
    bus: Bus
}

impl<Bus: RegisterBus> EmbeddedController<Bus> {
    #[must_use]
    pub fn new(bus: Bus) -> Self {
        Self { bus }
    }

    #[must_use]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    pub fn gpio(&self, pin: GpioPin) -> Result<bool, Error> {
        Ok((self.bus.read(pin.register())? & pin.mask()) != 0)
    }

    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    pub fn set_gpio(&self, pin: GpioPin, value: bool) -> Result<(), Error> {
        let mask = pin.mask();
        self.bus.update(pin.register(), |current| {
            if value { current | mask } else { current & !mask }
        })?;
        Ok(())
    }
}

impl<Bus: RegisterBus> FanPort for EmbeddedController<Bus> {
    fn manual(&self) -> Result<bool, Error> {
        Ok(FanFlags(self.bus.read(registers::FAN_FLAGS)?).manual())
    }

    fn set_manual(&self, manual: bool) -> Result<(), Error> {
        let flags = self.bus.update(registers::FAN_FLAGS, |raw| FanFlags(raw).with_manual(manual).0)?;
        debug!("Fan control flags are {flags:#04x}");
        Ok(())
    }

    fn speed(&self) -> Result<FanDuty, Error> {
        self.bus.read(registers::FAN_DUTY).map(FanDuty::new_clamped)
    }

    fn set_speed(&self, duty: FanDuty) -> Result<(), Error> {
        self.bus.write(registers::FAN_DUTY, duty.get())
    }

    fn rpm(&self) -> Result<u16, Error> {
        let high = self.bus.read(registers::FAN_RPM_HIGH)?;
        let low = self.bus.read(registers::FAN_RPM_LOW)?;
        Ok(u16::from_be_bytes([high, low]))
    }
}

impl<Bus: RegisterBus> VoltagePort for EmbeddedController<Bus> {
    fn voltage(&self) -> Result<Voltage, Error> {
        self.gpio(registers::VOLTAGE_PIN).map(Voltage::from)
    }

    fn set_voltage(&self, voltage: Voltage) -> Result<(), Error> {
        self.set_gpio(registers::VOLTAGE_PIN, voltage == Voltage::High)
    }
}

impl<Bus: RegisterBus> Thermometer for EmbeddedController<Bus> {
    fn temperature(&self) -> Result<u8, Error> {
        self.bus.read(registers::TEMPERATURE)
    }
}
