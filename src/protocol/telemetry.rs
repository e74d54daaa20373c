use super::{Envelope, ProtocolError};
use serde::Deserialize;

/// One combined sensor reading produced per edge cycle.
///
/// The raw fields hold the line exactly as read from the serial link. An empty
/// string means the sensor produced nothing during that cycle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelemetryMessage {
    #[serde(default)]
    lidar: String,
    #[serde(default)]
    gpr: String,
    #[serde(skip)]
    timestamp: f64,
}

impl TelemetryMessage {
    pub const TAG: &'static str = "telemetry";

    pub fn new(lidar: String, gpr: String, timestamp: f64) -> Self {
        Self { lidar, gpr, timestamp }
    }

    pub fn lidar(&self) -> &str { &self.lidar }
    pub fn gpr(&self) -> &str { &self.gpr }
    pub fn timestamp(&self) -> f64 { self.timestamp }

    /// Sensors that delivered no data this cycle.
    pub fn missing_sensors(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.lidar.is_empty() {
            missing.push("lidar");
        }
        if self.gpr.is_empty() {
            missing.push("gpr");
        }
        missing
    }

    pub fn to_envelope(&self) -> Envelope {
        let data = serde_json::json!({ "lidar": self.lidar, "gpr": self.gpr });
        Envelope::new(Self::TAG, data, self.timestamp)
    }

    /// Extracts a telemetry message from a parsed envelope.
    ///
    /// # Errors
    /// Fails if the envelope is tagged differently or its data is not an object of strings.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        if envelope.tag() != Self::TAG {
            return Err(ProtocolError::UnknownTag(envelope.tag().to_string()));
        }
        let mut msg: Self = serde_json::from_value(envelope.data().clone())
            .map_err(|_| ProtocolError::InvalidField("data"))?;
        msg.timestamp = envelope.timestamp();
        Ok(msg)
    }

    /// Parses raw bus bytes straight into a telemetry message.
    ///
    /// # Errors
    /// See [`Envelope::parse`] and [`TelemetryMessage::from_envelope`].
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::from_envelope(&Envelope::parse(bytes)?)
    }
}
