use super::ProtocolError;
use serde_json::{Map, Number, Value};

/// The wire record shared by telemetry and commands: a flat JSON object with
/// the keys `tag`, `data` and `timestamp`.
///
/// Inbound envelopes may spell the tag key `sensor` or `action` instead of `tag`;
/// outbound envelopes always use `tag`. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Names the sensor or the action carried in `data`.
    tag: String,
    data: Value,
    /// Seconds since the UNIX epoch on the producing node.
    timestamp: f64,
}

impl Envelope {
    const TAG_KEY: &'static str = "tag";
    const TAG_ALIASES: [&'static str; 2] = ["sensor", "action"];
    const DATA_KEY: &'static str = "data";
    const TIMESTAMP_KEY: &'static str = "timestamp";

    pub fn new(tag: impl Into<String>, data: Value, timestamp: f64) -> Self {
        Self { tag: tag.into(), data, timestamp }
    }

    pub fn tag(&self) -> &str { &self.tag }
    pub fn data(&self) -> &Value { &self.data }
    pub fn timestamp(&self) -> f64 { self.timestamp }

    /// Decodes an envelope from raw bus bytes.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] for anything that is not a JSON object with a
    /// non-empty string tag, a `data` field and a finite numeric timestamp.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let Value::Object(mut fields) = serde_json::from_slice::<Value>(bytes)? else {
            return Err(ProtocolError::NotAnObject);
        };

        let tag = std::iter::once(Self::TAG_KEY)
            .chain(Self::TAG_ALIASES)
            .find_map(|key| fields.remove(key))
            .ok_or(ProtocolError::MissingField(Self::TAG_KEY))?;
        let tag = match tag {
            Value::String(tag) if !tag.is_empty() => tag,
            _ => return Err(ProtocolError::InvalidField(Self::TAG_KEY)),
        };

        let data = fields
            .remove(Self::DATA_KEY)
            .ok_or(ProtocolError::MissingField(Self::DATA_KEY))?;

        let timestamp = fields
            .get(Self::TIMESTAMP_KEY)
            .ok_or(ProtocolError::MissingField(Self::TIMESTAMP_KEY))?
            .as_f64()
            .filter(|t| t.is_finite())
            .ok_or(ProtocolError::InvalidField(Self::TIMESTAMP_KEY))?;

        Ok(Self { tag, data, timestamp })
    }

    /// Encodes the envelope as a flat JSON object.
    pub fn serialize(&self) -> Vec<u8> {
        let mut fields = Map::new();
        fields.insert(Self::TAG_KEY.to_string(), Value::String(self.tag.clone()));
        fields.insert(Self::DATA_KEY.to_string(), self.data.clone());
        fields.insert(
            Self::TIMESTAMP_KEY.to_string(),
            Number::from_f64(self.timestamp).map_or(Value::Null, Value::Number),
        );
        Value::Object(fields).to_string().into_bytes()
    }
}

/// Wall clock time as float seconds since the UNIX epoch.
#[allow(clippy::cast_precision_loss)]
pub fn now_timestamp() -> f64 { chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0 }
