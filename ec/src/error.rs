#[derive(Debug)]
pub enum Error {
    Open(std::io::Error),
    PortRead { port: u16, source: std::io::Error },
    PortWrite { port: u16, source: std::io::Error }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Open(err) => write!(f, "Unable to open the port device: {err}"),
            Error::PortRead { port, source } => write!(f, "Unable to read port {port:#05x}: {source}"),
            Error::PortWrite { port, source } => write!(f, "Unable to write port {port:#05x}: {source}")
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open(err)
            | Error::PortRead { source: err, .. }
            | Error::PortWrite { source: err, .. } => Some(err)
        }
    }
}
