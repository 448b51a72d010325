use std::{error, fmt, io};

#[derive(Debug)]
pub enum Error {
    UnexpectedResponse,
    ConnectionClosed,
    ServerError { status: u16 },
    InvalidUrl(String),
    TransportError(Box<dyn error::Error + Send>),
    JsonError(Box<dyn error::Error + Send>),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedResponse => write!(f, "Unknown server response"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::ServerError { status } => write!(f, "Server error: {status}", status = status),
            Self::InvalidUrl(url) => write!(f, "Invalid URL: {url}", url = url),
            Self::TransportError(err) | Self::JsonError(err) => err.fmt(f),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(Box::new(err))
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Error::ServerError { status },
            ureq::Error::Io(err) => Error::IoError(err),
            err => Error::TransportError(Box::new(err)),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}
