use std::str::FromStr;

use ec::{FanDuty, FanPort, Thermometer, Voltage, VoltagePort};
use pll::{ClockPort, Dividers, Mhz};
use stepper::{Scheduler, StepController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    BusControl,
    CpuFreq,
    FanSpeed,
    FanRpm,
    FanControl,
    Temperature
}

impl Endpoint {
    pub const ALL: [Endpoint; 6] = [
        Endpoint::BusControl,
        Endpoint::CpuFreq,
        Endpoint::FanSpeed,
        Endpoint::FanRpm,
        Endpoint::FanControl,
        Endpoint::Temperature
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::BusControl => "bus_control",
            Endpoint::CpuFreq => "cpu_freq",
            Endpoint::FanSpeed => "fan_speed",
            Endpoint::FanRpm => "fan_rpm",
            Endpoint::FanControl => "fan_control",
            Endpoint::Temperature => "temperature"
        }
    }

    #[must_use]
    pub fn usage(self) -> &'static str {
        match self {
            Endpoint::BusControl => "M N PCI VOLTAGE, raw PLL dividers and core voltage (0/1)",
            Endpoint::CpuFreq => "MHz, stepped gradually",
            Endpoint::FanSpeed => "duty cycle in percent [0..100]",
            Endpoint::FanRpm => "read-only",
            Endpoint::FanControl => "0 for EC control, 1 for manual",
            Endpoint::Temperature => "read-only, °C"
        }
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(value: &str) -> Result<Endpoint, String> {
        Endpoint::ALL
            .into_iter()
            .find(|endpoint| endpoint.name() == value)
            .ok_or_else(|| format!("Unknown endpoint: {value}"))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub enum Error {
    InvalidInput(String),
    ReadOnly(Endpoint),
    Controller(stepper::Error)
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidInput(reason) => write!(f, "Invalid input: {reason}"),
            Error::ReadOnly(endpoint) => write!(f, "{endpoint} is read-only"),
            Error::Controller(err) => write!(f, "{err}")
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Controller(err) => Some(err),
            Error::InvalidInput(_) | Error::ReadOnly(_) => None
        }
    }
}

impl From<stepper::Error> for Error {
    fn from(err: stepper::Error) -> Self {
        Error::Controller(err)
    }
}

impl From<pll::Error> for Error {
    fn from(err: pll::Error) -> Self {
        Error::Controller(err.into())
    }
}

impl From<ec::Error> for Error {
    fn from(err: ec::Error) -> Self {
        Error::Controller(err.into())
    }
}

fn invalid(endpoint: Endpoint, input: &str) -> Error {
    Error::InvalidInput(format!("\"{input}\" for {endpoint}, expected {}", endpoint.usage()))
}

fn normalize(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses `M N PCI VOLTAGE`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the values are malformed or don't fit the PLL fields.
pub fn parse_bus_control(input: &str) -> Result<(Dividers, Voltage), Error> {
    let normalized = normalize(input);
    let (m, n, pci, voltage) = sscanf::sscanf!(normalized.as_str(), "{u8} {u16} {u8} {u8}")
        .map_err(|_| invalid(Endpoint::BusControl, input))?;

    let dividers = Dividers::new(m, n, pci)
        .map_err(|err| Error::InvalidInput(err.to_string()))?;

    let voltage = match voltage {
        0 => Voltage::Low,
        1 => Voltage::High,
        _ => return Err(invalid(Endpoint::BusControl, input))
    };

    Ok((dividers, voltage))
}

/// # Errors
///
/// Returns [`Error::InvalidInput`] unless the input is a positive number.
pub fn parse_frequency(input: &str) -> Result<Mhz, Error> {
    match input.trim().parse::<Mhz>() {
        Ok(mhz) if mhz > 0 => Ok(mhz),
        _ => Err(invalid(Endpoint::CpuFreq, input))
    }
}

/// # Errors
///
/// Returns [`Error::InvalidInput`] unless the input is a percentage in [0..100].
pub fn parse_fan_duty(input: &str) -> Result<FanDuty, Error> {
    input
        .trim()
        .parse::<u8>()
        .ok()
        .and_then(FanDuty::new)
        .ok_or_else(|| invalid(Endpoint::FanSpeed, input))
}

/// # Errors
///
/// Returns [`Error::InvalidInput`] unless the input is `0` or `1`.
pub fn parse_flag(input: &str) -> Result<bool, Error> {
    match input.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(invalid(Endpoint::FanControl, input))
    }
}

/// Named read/write access to the controller and the EC sensors.
pub struct Surface<'a, Clock, Fan, Volt, Sched, Therm>
where
    Clock: ClockPort + Send + Sync + 'static,
    Fan: FanPort + Send + Sync + 'static,
    Volt: VoltagePort + Send + Sync + 'static,
    Sched: Scheduler + 'static,
    Therm: Thermometer
{
    controller: &'a StepController<Clock, Fan, Volt, Sched>,
    thermometer: Therm
}

impl<'a, Clock, Fan, Volt, Sched, Therm> Surface<'a, Clock, Fan, Volt, Sched, Therm>
where
    Clock: ClockPort + Send + Sync + 'static,
    Fan: FanPort + Send + Sync + 'static,
    Volt: VoltagePort + Send + Sync + 'static,
    Sched: Scheduler + 'static,
    Therm: Thermometer
{
    pub fn new(controller: &'a StepController<Clock, Fan, Volt, Sched>, thermometer: Therm) -> Self {
        Self { controller, thermometer }
    }

    #[must_use]
    pub fn controller(&self) -> &StepController<Clock, Fan, Volt, Sched> {
        self.controller
    }

    /// Effective CPU frequency of the running PLL setting.
    ///
    /// # Errors
    ///
    /// Returns an error in case of a failed bus transaction.
    pub fn cpu_frequency(&self) -> Result<Mhz, Error> {
        let dividers = self.controller.ports().clock.read()?;
        Ok(self.controller.calibration().codec.to_frequency(dividers.m, dividers.n))
    }

    /// # Errors
    ///
    /// Returns an error in case of a failed hardware access.
    pub fn read(&self, endpoint: Endpoint) -> Result<String, Error> {
        let ports = self.controller.ports();
        let value = match endpoint {
            Endpoint::BusControl => {
                let dividers = ports.clock.read()?;
                let voltage = ports.voltage.voltage()?;
                format!("{} {} {} {}", dividers.m, dividers.n, dividers.pci, u8::from(voltage))
            }
            Endpoint::CpuFreq => self.cpu_frequency()?.to_string(),
            Endpoint::FanSpeed => ports.fan.speed()?.to_string(),
            Endpoint::FanRpm => ports.fan.rpm()?.to_string(),
            Endpoint::FanControl => u8::from(ports.fan.manual()?).to_string(),
            Endpoint::Temperature => self.thermometer.temperature()?.to_string()
        };

        Ok(value)
    }

    /// Malformed input is rejected before any hardware access.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is malformed, the endpoint is read-only
    /// or the hardware access fails.
    pub fn write(&self, endpoint: Endpoint, input: &str) -> Result<(), Error> {
        let ports = self.controller.ports();
        match endpoint {
            Endpoint::BusControl => {
                let (dividers, voltage) = parse_bus_control(input)?;
                ports.clock.write(dividers)?;
                ports.voltage.set_voltage(voltage)?;
            }
            Endpoint::CpuFreq => self.controller.request_frequency(parse_frequency(input)?)?,
            Endpoint::FanSpeed => ports.fan.set_speed(parse_fan_duty(input)?)?,
            Endpoint::FanControl => ports.fan.set_manual(parse_flag(input)?)?,
            Endpoint::FanRpm | Endpoint::Temperature => return Err(Error::ReadOnly(endpoint))
        }

        Ok(())
    }
}
