//! Wire format shared by the edge and decision nodes.
//!
//! Both telemetry and commands travel inside an [`Envelope`]; the typed messages
//! convert to and from it.

mod command;
mod envelope;
mod protocol_error;
mod telemetry;

#[cfg(test)]
mod tests;

pub use command::{CommandDefaults, CommandIntent, Direction};
pub use envelope::{Envelope, now_timestamp};
pub use protocol_error::ProtocolError;
pub use telemetry::TelemetryMessage;
