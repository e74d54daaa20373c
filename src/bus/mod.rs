//! Publish/subscribe client used by both nodes.
//!
//! [`BusSession`] owns the transport and drives inbound dispatch; publishing goes
//! through a cloneable [`BusPublisher`] so other tasks can publish concurrently.

mod bus_error;
mod bus_session;
mod mqtt_transport;

#[cfg(test)]
pub(crate) mod testing;

pub use bus_error::BusError;
pub use bus_session::BusSession;
pub use mqtt_transport::MqttTransport;

use async_trait::async_trait;
use std::sync::Arc;

/// A message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Fire-and-forget publishing. No delivery confirmation is awaited.
pub trait BusPublisher: Send + Sync {
    /// Hands `payload` to the transport for `topic`.
    ///
    /// # Errors
    /// [`BusError::Publish`] if the request could not even be queued.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError>;
}

/// The connection-level operations a [`BusSession`] needs from a broker client.
#[async_trait]
pub trait BusTransport: Send {
    async fn subscribe(&mut self, topic: &str) -> Result<(), BusError>;

    /// Waits for the next inbound message. An error ends the session.
    async fn next_message(&mut self) -> Result<InboundMessage, BusError>;

    fn publisher(&self) -> Arc<dyn BusPublisher>;
}

/// Receives every message published on one subscribed topic.
#[async_trait]
pub trait MessageHandler: Send {
    async fn handle(&mut self, payload: &[u8]);
}

impl BusSession<MqttTransport> {
    /// Connects to the configured broker.
    ///
    /// # Errors
    /// See [`MqttTransport::connect`].
    pub async fn connect(cfg: &crate::util::BrokerConfig) -> Result<Self, BusError> {
        MqttTransport::connect(cfg).await.map(Self::new)
    }
}
