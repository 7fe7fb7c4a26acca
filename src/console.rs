use std::io::{BufRead, Write};

use ec::{FanPort, Thermometer, VoltagePort};
use log::debug;
use pll::ClockPort;
use stepper::Scheduler;

use crate::surface::{Endpoint, Surface};

fn print_help(output: &mut impl Write) -> std::io::Result<()> {
    writeln!(output, "<endpoint>            prints the value")?;
    writeln!(output, "<endpoint> <values>   writes the value")?;
    writeln!(output, "status                shows the stepping session")?;
    writeln!(output, "quit                  leaves the console")?;
    writeln!(output)?;
    for endpoint in Endpoint::ALL {
        writeln!(output, "{:<21} {}", endpoint.name(), endpoint.usage())?;
    }
    Ok(())
}

/// Answers `<endpoint> [values]` lines until `quit` or the end of input.
///
/// # Errors
///
/// Returns an error only if the input can't be read or the output can't be written.
pub fn serve<Clock, Fan, Volt, Sched, Therm>(
    surface: &Surface<'_, Clock, Fan, Volt, Sched, Therm>,
    input: impl BufRead,
    mut output: impl Write
) -> std::io::Result<()>
where
    Clock: ClockPort + Send + Sync + 'static,
    Fan: FanPort + Send + Sync + 'static,
    Volt: VoltagePort + Send + Sync + 'static,
    Sched: Scheduler + 'static,
    Therm: Thermometer
{
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        let (command, values) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => print_help(&mut output)?,
            "status" => {
                let status = surface.controller().status();
                writeln!(
                    output,
                    "{:?}: M {}->{}, N {}->{}{}",
                    status.state,
                    status.clock.m_current,
                    status.clock.m_target,
                    status.clock.n_current,
                    status.clock.n_target,
                    if status.terminal { ", clamped" } else { "" }
                )?;
                if let Some(err) = surface.controller().take_error() {
                    writeln!(output, "last session failed: {err}")?;
                }
            }
            name => {
                let reply = name.parse::<Endpoint>()
                    .map_err(|err| err.to_string())
                    .and_then(|endpoint| {
                        debug!("console: {endpoint} {values}");
                        if values.trim().is_empty() {
                            surface.read(endpoint).map_err(|err| err.to_string())
                        } else {
                            surface.write(endpoint, values)
                                .map(|()| "OK".to_string())
                                .map_err(|err| err.to_string())
                        }
                    });

                match reply {
                    Ok(reply) => writeln!(output, "{reply}")?,
                    Err(err) => writeln!(output, "error: {err}")?
                }
            }
        }

        output.flush()?;
    }

    Ok(())
}
