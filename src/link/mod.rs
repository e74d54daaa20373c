//! Physical link plumbing shared by the sensor readers and the actuator.
//!
//! A [`Connector`] knows how to open one kind of link; the handle that owns the
//! open link tracks its [`LinkState`] and reconnects on the next use after a failure.

mod line_reader;
mod link_error;
mod link_state;
mod serial_link;

#[cfg(test)]
pub(crate) mod testing;

pub use line_reader::{LineSource, ReconnectingLineReader};
pub use link_error::LinkError;
pub use link_state::LinkState;
pub use serial_link::{SerialConnector, SerialLineSource};

use async_trait::async_trait;

/// Opens a fresh link of some kind. Each call returns an independent handle.
#[async_trait]
pub trait Connector: Send {
    type Link: Send;

    /// Human-readable name used in log lines (e.g. `"LiDAR"`).
    fn name(&self) -> &str;

    async fn connect(&mut self) -> Result<Self::Link, LinkError>;
}
