use std::time::Duration;

use pll::{ClockCodec, Dividers, Mhz};

use crate::error::Error;

/// Inclusive bounds of the PLL numerator N.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NWindow {
    pub min: u16,
    pub max: u16
}

impl NWindow {
    #[must_use]
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, n: u16) -> bool {
        (self.min..=self.max).contains(&n)
    }

    #[must_use]
    pub fn clamp(&self, n: u16) -> u16 {
        n.clamp(self.min, self.max)
    }
}

impl std::fmt::Display for NWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..{}]", self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Standard,
    Overclock
}

/// Board limits of the stepping loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calibration {
    pub codec: ClockCodec,
    pub standard_m: u8,
    pub overclock_m: u8,
    /// N used for every overclock request.
    pub overclock_n: u16,
    pub standard_window: NWindow,
    /// N bounds while the overclock divisor is still active on the way down.
    pub overclock_window: NWindow,
    pub overclock_threshold_mhz: Mhz,
    pub high_voltage_mhz: Mhz,
    pub n_step: u16,
    pub step_delay: Duration,
    pub overclock_fan_percent: u8
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            codec: ClockCodec::REFERENCE,
            standard_m: 50,
            overclock_m: 49,
            overclock_n: 462,
            standard_window: NWindow::new(260, 462),
            overclock_window: NWindow::new(440, 462),
            overclock_threshold_mhz: 1774,
            high_voltage_mhz: 1700,
            n_step: 3,
            step_delay: Duration::from_millis(200),
            overclock_fan_percent: 90
        }
    }
}

impl Calibration {
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first inconsistent field.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: String| Err(Error::InvalidInput(reason));

        if self.n_step == 0 {
            return invalid("N step must be positive".to_string());
        }

        for (name, m) in [("standard", self.standard_m), ("overclock", self.overclock_m)] {
            if !(1..=Dividers::M_MAX).contains(&m) {
                return invalid(format!("{name} divisor {m} is out of [1..{}]", Dividers::M_MAX));
            }
        }

        if self.overclock_m >= self.standard_m {
            return invalid(format!(
                "overclock divisor {} must be below the standard one {}",
                self.overclock_m, self.standard_m
            ));
        }

        for (name, window) in [("standard", self.standard_window), ("overclock", self.overclock_window)] {
            if window.min > window.max || window.max > Dividers::N_MAX {
                return invalid(format!("{name} window {window} is malformed"));
            }
        }

        if !self.standard_window.contains(self.overclock_n) {
            return invalid(format!(
                "overclock N {} is outside of the standard window {}",
                self.overclock_n, self.standard_window
            ));
        }

        if self.overclock_fan_percent > 100 {
            return invalid(format!("fan duty {}% is above 100%", self.overclock_fan_percent));
        }

        Ok(())
    }

    #[must_use]
    pub fn regime(&self, mhz: Mhz) -> Regime {
        if mhz >= self.overclock_threshold_mhz {
            Regime::Overclock
        } else {
            Regime::Standard
        }
    }

    /// Window that bounds N for the given divisor pair.
    ///
    /// The overclock window applies while descending from the overclock divisor,
    /// until the divisor has been switched back.
    #[must_use]
    pub fn window(&self, m_current: u8, m_target: u8) -> NWindow {
        if m_current == self.overclock_m && m_target != self.overclock_m {
            self.overclock_window
        } else {
            self.standard_window
        }
    }
}
