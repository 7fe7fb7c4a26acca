use crate::control::Dividers;

#[derive(Debug)]
pub enum Error {
    BusUnavailable(String),
    Open(std::io::Error),
    Transaction(std::io::Error),
    ShortBlock(usize),
    InvalidDividers(Dividers)
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BusUnavailable(reason) => write!(f, "SMBus adapter unavailable: {reason}"),
            Error::Open(err) => write!(f, "Unable to open the SMBus device: {err}"),
            Error::Transaction(err) => write!(f, "SMBus transaction failed: {err}"),
            Error::ShortBlock(len) => write!(f, "PLL control block is too short ({len} bytes)"),
            Error::InvalidDividers(dividers) => write!(f, "Dividers out of range: {dividers}")
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open(err) | Error::Transaction(err) => Some(err),
            Error::BusUnavailable(_)
            | Error::ShortBlock(_)
            | Error::InvalidDividers(_) => None
        }
    }
}
