use std::fmt;

/// Failures of the message bus session.
///
/// Only [`BusError::ConnectionLost`] and [`BusError::Connect`] are fatal to a
/// process; the others are contained by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The broker could not be reached or refused the session.
    Connect(String),
    /// The live session dropped while dispatching.
    ConnectionLost(String),
    /// A publish request could not be handed to the client.
    Publish(String),
    Subscribe(String),
    /// A handler is already registered for the topic.
    DuplicateSubscription(String),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "bus connect failed: {msg}"),
            Self::ConnectionLost(msg) => write!(f, "bus connection lost: {msg}"),
            Self::Publish(msg) => write!(f, "publish failed: {msg}"),
            Self::Subscribe(msg) => write!(f, "subscribe failed: {msg}"),
            Self::DuplicateSubscription(topic) => {
                write!(f, "topic '{topic}' already has a handler")
            }
        }
    }
}

impl std::error::Error for BusError {}
