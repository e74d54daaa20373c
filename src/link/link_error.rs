use std::fmt;
use tokio_util::codec::LinesCodecError;

/// Failure of a physical link. Always recovered locally by reconnecting on next use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The link could not be opened.
    Unavailable(String),
    /// The link was open but reading or writing failed.
    Io(String),
    /// The peer closed the link.
    Closed,
    /// The connection string could not be understood.
    InvalidAddress(String),
    /// The peer did not show up within the attempt timeout.
    Timeout,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "link unavailable: {msg}"),
            Self::Io(msg) => write!(f, "link i/o failure: {msg}"),
            Self::Closed => write!(f, "link closed by peer"),
            Self::InvalidAddress(addr) => write!(f, "invalid connection string '{addr}'"),
            Self::Timeout => write!(f, "link attempt timed out"),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<std::io::Error> for LinkError {
    fn from(value: std::io::Error) -> Self { LinkError::Io(value.to_string()) }
}

impl From<LinesCodecError> for LinkError {
    fn from(value: LinesCodecError) -> Self {
        match value {
            LinesCodecError::MaxLineLengthExceeded => {
                LinkError::Io("frame exceeds maximum line length".to_string())
            }
            LinesCodecError::Io(err) => LinkError::from(err),
        }
    }
}

impl From<tokio_serial::Error> for LinkError {
    fn from(value: tokio_serial::Error) -> Self { LinkError::Unavailable(value.to_string()) }
}
