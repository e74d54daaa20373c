//! In-memory bus for exercising sessions and loops without a broker.

use super::{BusError, BusPublisher, BusTransport, InboundMessage};
use async_trait::async_trait;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::mpsc;

/// Records every publish; can be switched into a failing mode.
#[derive(Default)]
pub(crate) struct RecordingPublisher {
    sent: Mutex<Vec<(String, Vec<u8>)>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub(crate) fn sent(&self) -> Vec<(String, Vec<u8>)> { self.sent.lock().unwrap().clone() }

    pub(crate) fn set_failing(&self, failing: bool) { self.failing.store(failing, Ordering::SeqCst); }
}

impl BusPublisher for RecordingPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BusError::Publish("request queue full".to_string()));
        }
        self.sent.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }
}

/// Test-side handle: injects inbound traffic and inspects outbound traffic.
#[derive(Clone)]
pub(crate) struct LoopbackHandle {
    inbound: mpsc::UnboundedSender<Result<InboundMessage, BusError>>,
    pub(crate) publisher: Arc<RecordingPublisher>,
    pub(crate) subscriptions: Arc<Mutex<Vec<String>>>,
}

impl LoopbackHandle {
    pub(crate) fn deliver(&self, topic: &str, payload: impl Into<Vec<u8>>) {
        let msg = InboundMessage { topic: topic.to_string(), payload: payload.into() };
        self.inbound.send(Ok(msg)).unwrap();
    }

    /// Makes the session observe a dropped connection.
    pub(crate) fn drop_connection(&self) {
        self.inbound
            .send(Err(BusError::ConnectionLost("socket reset by broker".to_string())))
            .unwrap();
    }
}

pub(crate) struct LoopbackTransport {
    inbound: mpsc::UnboundedReceiver<Result<InboundMessage, BusError>>,
    publisher: Arc<RecordingPublisher>,
    subscriptions: Arc<Mutex<Vec<String>>>,
}

pub(crate) fn loopback() -> (LoopbackTransport, LoopbackHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let publisher = Arc::new(RecordingPublisher::default());
    let subscriptions = Arc::new(Mutex::new(Vec::new()));
    (
        LoopbackTransport {
            inbound: rx,
            publisher: Arc::clone(&publisher),
            subscriptions: Arc::clone(&subscriptions),
        },
        LoopbackHandle { inbound: tx, publisher, subscriptions },
    )
}

#[async_trait]
impl BusTransport for LoopbackTransport {
    async fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        self.subscriptions.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    async fn next_message(&mut self) -> Result<InboundMessage, BusError> {
        self.inbound
            .recv()
            .await
            .unwrap_or_else(|| Err(BusError::ConnectionLost("loopback closed".to_string())))
    }

    fn publisher(&self) -> Arc<dyn BusPublisher> { Arc::clone(&self.publisher) as Arc<dyn BusPublisher> }
}
