use std::sync::Arc;

use crate::error::Error;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Voltage {
    #[default]
    Low,
    High
}

impl From<bool> for Voltage {
    fn from(high: bool) -> Self {
        if high { Voltage::High } else { Voltage::Low }
    }
}

impl From<Voltage> for u8 {
    fn from(voltage: Voltage) -> Self {
        match voltage {
            Voltage::Low => 0,
            Voltage::High => 1
        }
    }
}

type Percent = u8;

/// Fan PWM duty cycle, a percentage in the range of [0..100].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FanDuty(Percent);

impl FanDuty {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(100);

    /// Clamps the given percentage into [0..100].
    #[inline]
    #[must_use]
    pub fn new_clamped(percent: Percent) -> Self {
        Self(percent.min(Self::MAX.0))
    }

    #[inline]
    #[must_use]
    pub fn new(percent: Percent) -> Option<Self> {
        if percent <= Self::MAX.0 {
            Some(Self(percent))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> Percent {
        self.0
    }
}

impl std::fmt::Display for FanDuty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait FanPort {
    /// `true` if the fan is forced into manual control, `false` if the EC drives it.
    ///
    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    fn manual(&self) -> Result<bool, Error>;

    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    fn set_manual(&self, manual: bool) -> Result<(), Error>;

    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    fn speed(&self) -> Result<FanDuty, Error>;

    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    fn set_speed(&self, duty: FanDuty) -> Result<(), Error>;

    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    fn rpm(&self) -> Result<u16, Error>;
}

pub trait VoltagePort {
    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    fn voltage(&self) -> Result<Voltage, Error>;

    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    fn set_voltage(&self, voltage: Voltage) -> Result<(), Error>;
}

pub trait Thermometer {
    /// CPU temperature in °C.
    ///
    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    fn temperature(&self) -> Result<u8, Error>;
}

impl<T: FanPort + ?Sized> FanPort for Arc<T> {
    fn manual(&self) -> Result<bool, Error> {
        (**self).manual()
    }

    fn set_manual(&self, manual: bool) -> Result<(), Error> {
        (**self).set_manual(manual)
    }

    fn speed(&self) -> Result<FanDuty, Error> {
        (**self).speed()
    }

    fn set_speed(&self, duty: FanDuty) -> Result<(), Error> {
        (**self).set_speed(duty)
    }

    fn rpm(&self) -> Result<u16, Error> {
        (**self).rpm()
    }
}

impl<T: VoltagePort + ?Sized> VoltagePort for Arc<T> {
    fn voltage(&self) -> Result<Voltage, Error> {
        (**self).voltage()
    }

    fn set_voltage(&self, voltage: Voltage) -> Result<(), Error> {
        (**self).set_voltage(voltage)
    }
}

impl<T: Thermometer + ?Sized> Thermometer for Arc<T> {
    fn temperature(&self) -> Result<u8, Error> {
        (**self).temperature()
    }
}
