use std::{path::PathBuf, time::Duration};

use pll::ClockCodec;
use stepper::{Calibration, NWindow};
use structopt::StructOpt;

use crate::surface::Endpoint;

#[derive(Debug, StructOpt)]
#[structopt(name = "eeefsb", about = "Runtime CPU clock stepping for the Eee PC.")]
pub struct Opt {
    /// Logs every stepping tick
    #[structopt(short, long)]
    pub verbose: bool,

    #[structopt(long, default_value = "/dev/port", parse(from_os_str))]
    pub port_device: PathBuf,

    /// Part of the name of the SMBus adapter the clock synthesizer sits on
    #[structopt(long, default_value = "I801")]
    pub smbus_adapter: String,

    #[structopt(long, default_value = "0x69", parse(try_from_str = parse_address))]
    pub pll_address: u16,

    #[structopt(long, default_value = "24")]
    pub pll_const: u32,

    #[structopt(long, default_value = "8")]
    pub cpu_mul: u32,

    #[structopt(long, default_value = "50")]
    pub standard_m: u8,

    #[structopt(long, default_value = "49")]
    pub overclock_m: u8,

    #[structopt(long, default_value = "462")]
    pub overclock_n: u16,

    /// N bounds at the standard divisor, MIN..MAX
    #[structopt(long, default_value = "260..462", parse(try_from_str = parse_window))]
    pub standard_window: NWindow,

    /// N bounds while leaving the overclock divisor, MIN..MAX
    #[structopt(long, default_value = "440..462", parse(try_from_str = parse_window))]
    pub overclock_window: NWindow,

    /// Requests at or above this frequency (MHz) use the overclock divisor
    #[structopt(long, default_value = "1774")]
    pub overclock_threshold: u32,

    /// Frequency (MHz) from which the core voltage is raised
    #[structopt(long, default_value = "1700")]
    pub high_voltage: u32,

    #[structopt(long, default_value = "3")]
    pub n_step: u16,

    /// Delay between ticks in milliseconds
    #[structopt(long, default_value = "200")]
    pub step_delay: u64,

    /// Fan duty (%) forced while overclocked
    #[structopt(long, default_value = "90")]
    pub overclock_fan: u8,

    #[structopt(subcommand)]
    pub command: Command
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Prints the value of an endpoint
    Get {
        endpoint: Endpoint
    },

    /// Writes an endpoint, cpu_freq waits for the stepping to finish
    Set {
        endpoint: Endpoint,

        #[structopt(required = true)]
        values: Vec<String>
    },

    /// Reads `<endpoint> [values]` lines from stdin
    Serve
}

fn parse_address(value: &str) -> Result<u16, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse::<u16>()
    };

    parsed.map_err(|err| format!("Invalid address {value}: {err}"))
}

fn parse_window(value: &str) -> Result<NWindow, String> {
    let (min, max) = sscanf::sscanf!(value, "{u16}..{u16}")
        .map_err(|_| format!("Invalid window {value}, expected MIN..MAX"))?;

    if min > max {
        return Err(format!("Invalid window {value}: {min} is above {max}"));
    }

    Ok(NWindow::new(min, max))
}

impl Opt {
    /// # Errors
    ///
    /// Returns a description of the first invalid calibration value.
    pub fn calibration(&self) -> Result<Calibration, String> {
        let codec = ClockCodec::new(self.pll_const, self.cpu_mul)
            .ok_or_else(|| "PLL constant and CPU multiplier must be non-zero".to_string())?;

        let calibration = Calibration {
            codec,
            standard_m: self.standard_m,
            overclock_m: self.overclock_m,
            overclock_n: self.overclock_n,
            standard_window: self.standard_window,
            overclock_window: self.overclock_window,
            overclock_threshold_mhz: self.overclock_threshold,
            high_voltage_mhz: self.high_voltage,
            n_step: self.n_step,
            step_delay: Duration::from_millis(self.step_delay),
            overclock_fan_percent: self.overclock_fan
        };

        calibration.validate().map_err(|err| err.to_string())?;
        Ok(calibration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_reference_board() {
        let opt = Opt::from_iter(["eeefsb", "serve"]);
        assert_eq!(opt.calibration().unwrap(), Calibration::default());
        assert_eq!(opt.pll_address, 0x69);
        assert!(matches!(opt.command, Command::Serve));
    }

    #[test]
    fn set_collects_values() {
        let opt = Opt::from_iter(["eeefsb", "-v", "set", "bus_control", "50", "420", "15", "0"]);
        assert!(opt.verbose);
        match opt.command {
            Command::Set { endpoint, values } => {
                assert_eq!(endpoint, Endpoint::BusControl);
                assert_eq!(values, ["50", "420", "15", "0"]);
            }
            command => panic!("unexpected {command:?}")
        }

        assert!(Opt::from_iter_safe(["eeefsb", "get", "turbo"]).is_err());
        assert!(Opt::from_iter_safe(["eeefsb", "set", "cpu_freq"]).is_err());
    }

    #[test]
    fn calibration_flags() {
        let opt = Opt::from_iter(["eeefsb", "--n-step", "5", "--standard-window", "300..450", "--overclock-n", "450", "serve"]);
        let calibration = opt.calibration().unwrap();
        assert_eq!(calibration.n_step, 5);
        assert_eq!(calibration.standard_window, NWindow::new(300, 450));

        let opt = Opt::from_iter(["eeefsb", "--overclock-m", "51", "serve"]);
        assert!(opt.calibration().is_err());

        let opt = Opt::from_iter(["eeefsb", "--cpu-mul", "0", "serve"]);
        assert!(opt.calibration().is_err());
    }

    #[test]
    fn addresses_and_windows() {
        assert_eq!(parse_address("0x69"), Ok(0x69));
        assert_eq!(parse_address("105"), Ok(105));
        assert!(parse_address("0xZZ").is_err());

        assert_eq!(parse_window("260..462"), Ok(NWindow::new(260, 462)));
        assert!(parse_window("462..260").is_err());
        assert!(parse_window("260-462").is_err());
    }
}
