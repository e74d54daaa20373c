use std::fmt;

/// Raised when an inbound payload cannot be turned into an envelope or into
/// one of the typed messages carried by an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The payload is not valid JSON.
    Syntax(String),
    /// The payload is valid JSON but not an object.
    NotAnObject,
    MissingField(&'static str),
    /// A field is present but has the wrong type or an invalid value.
    InvalidField(&'static str),
    /// The envelope tag does not name a known sensor or action.
    UnknownTag(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(msg) => write!(f, "malformed envelope: {msg}"),
            Self::NotAnObject => write!(f, "envelope is not a JSON object"),
            Self::MissingField(field) => write!(f, "envelope is missing field '{field}'"),
            Self::InvalidField(field) => write!(f, "envelope field '{field}' is invalid"),
            Self::UnknownTag(tag) => write!(f, "unknown envelope tag '{tag}'"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<serde_json::Error> for ProtocolError {
    fn from(value: serde_json::Error) -> Self { ProtocolError::Syntax(value.to_string()) }
}
