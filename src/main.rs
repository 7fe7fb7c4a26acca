#![warn(clippy::pedantic)]

use std::{
    io::{self, BufWriter},
    sync::Arc,
    time::Duration
};

use ec::{dev_port::DevPort, EmbeddedController, IndexedIo};
use log::{error, info};
use pll::{Pll, SmbusDevice};
use stepper::{Ports, StepController, TimerScheduler};
use structopt::StructOpt;

use crate::{
    cli::{Command, Opt},
    logger::Logger,
    surface::{Endpoint, Surface}
};

mod cli;
mod console;
mod logger;
mod platform;
mod surface;

#[cfg(test)]
mod testing;

type Ec = EmbeddedController<IndexedIo<DevPort>>;
type Clock = Pll<SmbusDevice>;
type Controller = StepController<Arc<Clock>, Arc<Ec>, Arc<Ec>, TimerScheduler>;

struct Hardware {
    ec: Arc<Ec>,
    clock: Arc<Clock>
}

fn open_hardware(opt: &Opt) -> Result<Hardware, String> {
    let ports = DevPort::open(&opt.port_device)
        .map_err(|err| format!("Unable to access the embedded controller: {err}"))?;
    let ec = Arc::new(EmbeddedController::new(IndexedIo::new(ports)));

    let adapter = SmbusDevice::find_adapter(SmbusDevice::SYSFS_ADAPTERS, &opt.smbus_adapter)
        .map_err(|err| format!("Unable to find the clock synthesizer bus: {err}"))?;
    let device = SmbusDevice::open(adapter, opt.pll_address)
        .map_err(|err| format!("Unable to open the clock synthesizer: {err}"))?;
    let clock = Arc::new(Pll::new(device)
        .map_err(|err| format!("Unable to read the clock synthesizer: {err}"))?);

    Ok(Hardware { ec, clock })
}

/// Longest time a `set cpu_freq` may take: one tick per N unit plus some slack.
fn stepping_timeout(controller: &Controller) -> Duration {
    let calibration = controller.calibration();
    let ticks = u32::from(pll::Dividers::N_MAX / calibration.n_step.max(1)) + 2;
    calibration.step_delay * ticks + Duration::from_secs(1)
}

fn run(opt: &Opt, surface: &Surface<'_, Arc<Clock>, Arc<Ec>, Arc<Ec>, TimerScheduler, Arc<Ec>>) -> Result<(), String> {
    match &opt.command {
        Command::Get { endpoint } => {
            let value = surface.read(*endpoint).map_err(|err| err.to_string())?;
            println!("{value}");
        }
        Command::Set { endpoint, values } => {
            surface.write(*endpoint, &values.join(" ")).map_err(|err| err.to_string())?;

            if *endpoint == Endpoint::CpuFreq {
                let controller = surface.controller();
                if !controller.wait_idle(stepping_timeout(controller)) {
                    return Err("Stepping didn't finish in time".to_string());
                }

                if let Some(err) = controller.take_error() {
                    return Err(format!("Stepping failed: {err}"));
                }

                if controller.status().terminal {
                    error!("Stepping was cut short by the N window");
                }

                let reached = surface.cpu_frequency().map_err(|err| err.to_string())?;
                println!("{reached}");
            }
        }
        Command::Serve => {
            info!("Serving endpoints on stdin, \"help\" lists them");
            console::serve(surface, io::stdin().lock(), BufWriter::new(io::stdout()))
                .map_err(|err| format!("Console I/O failed: {err}"))?;
        }
    }

    Ok(())
}

fn main() -> Result<(), ()> {
    let opt = Opt::from_args();

    if let Err(err) = logger::init(Logger { log_steps: opt.verbose }) {
        eprintln!("Unable to set up logging: {err}");
        return Err(());
    }

    platform::check_cpu();

    let calibration = opt.calibration().map_err(|err| {
        eprintln!("Invalid calibration: {err}");
    })?;

    let hardware = open_hardware(&opt).map_err(|err| {
        eprintln!("{err}");
    })?;

    let scheduler = TimerScheduler::new("eeefsb-step").map_err(|err| {
        eprintln!("Unable to start the stepping timer: {err}");
    })?;

    let ports = Ports {
        clock: Arc::clone(&hardware.clock),
        fan: Arc::clone(&hardware.ec),
        voltage: Arc::clone(&hardware.ec)
    };

    let controller: Arc<Controller> = match StepController::new(calibration, ports, scheduler) {
        Ok(controller) => Arc::new(controller),
        Err(err) => {
            eprintln!("Unable to set up the step controller: {err}");
            return Err(());
        }
    };

    let handler_controller = Arc::clone(&controller);
    if let Err(err) = ctrlc::set_handler(move || {
        handler_controller.shutdown();
        std::process::exit(0);
    }) {
        eprintln!("Unable to set the Ctrl-C handler: {err}");
        return Err(());
    }

    let surface = Surface::new(&controller, Arc::clone(&hardware.ec));
    let result = run(&opt, &surface);

    controller.shutdown();

    result.map_err(|err| {
        eprintln!("{err}");
    })
}
