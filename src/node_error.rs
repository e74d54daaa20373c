use crate::bus::BusError;
use crate::link::LinkError;
use std::fmt;

/// Reasons a node process stops with a non-zero exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    Bus(BusError),
    Link(LinkError),
    /// A node loop ended while the bus session was still up.
    LoopStopped { name: &'static str, reason: String },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus error: {e}"),
            Self::Link(e) => write!(f, "link error: {e}"),
            Self::LoopStopped { name, reason } => write!(f, "{name} stopped: {reason}"),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<BusError> for NodeError {
    fn from(value: BusError) -> Self { Self::Bus(value) }
}

impl From<LinkError> for NodeError {
    fn from(value: LinkError) -> Self { Self::Link(value) }
}
