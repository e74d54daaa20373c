use crate::bus::MessageHandler;
use crate::protocol::TelemetryMessage;
use crate::{event, log, warn};
use async_trait::async_trait;
use tokio::sync::watch;

/// Creates the latest-telemetry cell, split into its only writer and only reader.
pub fn telemetry_slot() -> (SlotWriter, SlotReader) {
    let (tx, rx) = watch::channel(None);
    (SlotWriter { tx }, SlotReader { rx })
}

/// Replaces the slot content wholesale.
pub struct SlotWriter {
    tx: watch::Sender<Option<TelemetryMessage>>,
}

impl SlotWriter {
    pub fn store(&self, msg: TelemetryMessage) { self.tx.send_replace(Some(msg)); }
}

/// Reads the newest telemetry. Keeps the last value after the writer is gone.
pub struct SlotReader {
    rx: watch::Receiver<Option<TelemetryMessage>>,
}

impl SlotReader {
    pub fn snapshot(&self) -> Option<TelemetryMessage> { self.rx.borrow().clone() }
}

/// Bus handler for the data topic: decodes telemetry into the slot.
pub struct TelemetryIntake {
    writer: SlotWriter,
}

impl TelemetryIntake {
    pub fn new(writer: SlotWriter) -> Self { Self { writer } }
}

#[async_trait]
impl MessageHandler for TelemetryIntake {
    async fn handle(&mut self, payload: &[u8]) {
        match TelemetryMessage::parse(payload) {
            Ok(msg) => {
                log!("Sensor data from {:.3} received.", msg.timestamp());
                event!("Telemetry: lidar={:?} gpr={:?}", msg.lidar(), msg.gpr());
                self.writer.store(msg);
            }
            Err(e) => warn!("Ignoring telemetry payload: {e}."),
        }
    }
}
