use std::{fmt, io};

use tracing::debug;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    FileFormat(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::FileFormat(err) => write!(f, "Configuration file format error: {err}"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        debug!("TOML error: {error}");
        Error::FileFormat(error.to_string())
    }
}
