use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

/// # Errors
///
/// Returns an error if a logger is already installed.
pub fn init(logger: Logger) -> Result<(), SetLoggerError> {
    let level = logger.max_level();
    log::set_boxed_logger(Box::new(logger))
        .map(|()| log::set_max_level(level))
}

pub struct Logger {
    pub log_steps: bool
}

impl Logger {
    /// Most verbose level any record passing [`log::Log::enabled`] can have.
    #[must_use]
    pub fn max_level(&self) -> LevelFilter {
        if self.log_steps { LevelFilter::Trace } else { LevelFilter::Info }
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match metadata.target() {
            stepper::controller::STEP_TARGET => self.log_steps,
            target => {
                let chunks: Vec<&str> = target.split("::").collect();
                match chunks[..] {
                    ["eeefsb" | "ec" | "pll" | "stepper", ..] => {
                        self.log_steps || metadata.level() <= Level::Info
                    }
                    _ => metadata.level() <= Level::Warn
                }
            }
        }
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if record.level() < Level::Info {
                eprint!("{} - ", record.level());
            }

            eprintln!("{}", record.args());
        }
    }

    fn flush(&self) {}
}
