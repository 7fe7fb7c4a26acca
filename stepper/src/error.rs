#[derive(Debug)]
pub enum Source {
    Clock(pll::Error),
    Embedded(ec::Error)
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Clock(err) => write!(f, "clock synthesizer: {err}"),
            Source::Embedded(err) => write!(f, "embedded controller: {err}")
        }
    }
}

#[derive(Debug)]
pub enum Error {
    BusUnavailable(String),
    TransactionFailed(Source),
    InvalidInput(String),
    ShuttingDown
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BusUnavailable(reason) => write!(f, "Bus unavailable: {reason}"),
            Error::TransactionFailed(source) => write!(f, "Hardware transaction failed, {source}"),
            Error::InvalidInput(reason) => write!(f, "Invalid input: {reason}"),
            Error::ShuttingDown => write!(f, "The controller is shutting down")
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::TransactionFailed(Source::Clock(err)) => Some(err),
            Error::TransactionFailed(Source::Embedded(err)) => Some(err),
            Error::BusUnavailable(_) | Error::InvalidInput(_) | Error::ShuttingDown => None
        }
    }
}

impl From<pll::Error> for Error {
    fn from(err: pll::Error) -> Self {
        match err {
            pll::Error::BusUnavailable(reason) => Error::BusUnavailable(reason),
            err => Error::TransactionFailed(Source::Clock(err))
        }
    }
}

impl From<ec::Error> for Error {
    fn from(err: ec::Error) -> Self {
        Error::TransactionFailed(Source::Embedded(err))
    }
}
