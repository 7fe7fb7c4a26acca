use ec::{FanDuty, FanPort};
use log::{debug, info};

/// Fan state from before the controller forced the fan up for an overclock.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanMemory {
    pub manual_before_override: bool,
    /// Zero when the fan was under EC control.
    pub speed_before_override: FanDuty,
    pub engaged: bool
}

impl FanMemory {
    /// Remembers the current fan state (unless an override is already active) and
    /// forces the fan to `forced` duty.
    ///
    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    pub fn engage<Fan: FanPort + ?Sized>(&mut self, fan: &Fan, forced: FanDuty) -> Result<(), ec::Error> {
        if !self.engaged {
            let manual = fan.manual()?;
            let speed = if manual { fan.speed()? } else { FanDuty::MIN };
            *self = Self {
                manual_before_override: manual,
                speed_before_override: speed,
                engaged: true
            };
            debug!("Fan state saved: manual={manual}, duty={speed}%");
        }

        fan.set_manual(true)?;
        fan.set_speed(forced)?;
        info!("Fan forced to {forced}%");
        Ok(())
    }

    /// Puts the saved duty back if the fan is still forced, then returns the fan to
    /// the embedded controller and forgets the saved state.
    ///
    /// # Errors
    ///
    /// Returns an error in case of a failed EC access.
    pub fn release<Fan: FanPort + ?Sized>(&mut self, fan: &Fan) -> Result<(), ec::Error> {
        if self.speed_before_override != FanDuty::MIN && fan.manual()? {
            fan.set_speed(self.speed_before_override)?;
            debug!("Fan duty restored to {}%", self.speed_before_override);
        }

        fan.set_manual(false)?;
        *self = Self::default();
        Ok(())
    }
}
