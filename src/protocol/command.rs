use super::{Envelope, ProtocolError};
use serde_json::{Value, json};
use std::fmt;
use strum_macros::{Display, EnumString};

/// Horizontal movement direction relative to the drone's heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

/// An abstract movement intent. Re-delivery re-executes the action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandIntent {
    Takeoff { altitude: f64 },
    Land,
    Move { direction: Direction, speed: f64 },
    Hover,
}

/// Values used for optional command parameters a sender left out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandDefaults {
    pub altitude: f64,
    pub speed: f64,
    pub direction: Direction,
}

impl Default for CommandDefaults {
    fn default() -> Self { Self { altitude: 20.0, speed: 10.0, direction: Direction::Forward } }
}

impl CommandIntent {
    /// The envelope tag for this variant.
    pub fn action(&self) -> &'static str {
        match self {
            CommandIntent::Takeoff { .. } => "takeoff",
            CommandIntent::Land => "land",
            CommandIntent::Move { .. } => "move",
            CommandIntent::Hover => "hover",
        }
    }

    pub fn to_envelope(&self, timestamp: f64) -> Envelope {
        let data = match self {
            CommandIntent::Takeoff { altitude } => json!({ "altitude": altitude }),
            CommandIntent::Move { direction, speed } => {
                json!({ "direction": direction.to_string(), "speed": speed })
            }
            CommandIntent::Land | CommandIntent::Hover => json!({}),
        };
        Envelope::new(self.action(), data, timestamp)
    }

    /// Decodes a command from an envelope, filling absent parameters from `defaults`.
    ///
    /// # Errors
    /// Fails on unknown actions and on parameters of the wrong type or range.
    pub fn from_envelope(
        envelope: &Envelope,
        defaults: &CommandDefaults,
    ) -> Result<Self, ProtocolError> {
        let data = envelope.data();
        match envelope.tag() {
            "takeoff" => Ok(CommandIntent::Takeoff {
                altitude: Self::magnitude(data, "altitude")?.unwrap_or(defaults.altitude),
            }),
            "land" => Ok(CommandIntent::Land),
            "hover" => Ok(CommandIntent::Hover),
            "move" => {
                let direction = match Self::param(data, "direction")? {
                    None => defaults.direction,
                    Some(Value::String(raw)) => {
                        raw.parse().map_err(|_| ProtocolError::InvalidField("direction"))?
                    }
                    Some(_) => return Err(ProtocolError::InvalidField("direction")),
                };
                let speed = Self::magnitude(data, "speed")?.unwrap_or(defaults.speed);
                Ok(CommandIntent::Move { direction, speed })
            }
            other => Err(ProtocolError::UnknownTag(other.to_string())),
        }
    }

    /// Parses raw bus bytes straight into a command.
    ///
    /// # Errors
    /// See [`Envelope::parse`] and [`CommandIntent::from_envelope`].
    pub fn parse(bytes: &[u8], defaults: &CommandDefaults) -> Result<Self, ProtocolError> {
        Self::from_envelope(&Envelope::parse(bytes)?, defaults)
    }

    fn param<'a>(data: &'a Value, key: &'static str) -> Result<Option<&'a Value>, ProtocolError> {
        match data {
            Value::Object(fields) => Ok(fields.get(key).filter(|v| !v.is_null())),
            Value::Null => Ok(None),
            _ => Err(ProtocolError::InvalidField("data")),
        }
    }

    fn magnitude(data: &Value, key: &'static str) -> Result<Option<f64>, ProtocolError> {
        Self::param(data, key)?
            .map(|v| {
                v.as_f64()
                    .filter(|x| x.is_finite() && *x >= 0.0)
                    .ok_or(ProtocolError::InvalidField(key))
            })
            .transpose()
    }
}

impl fmt::Display for CommandIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandIntent::Takeoff { altitude } => write!(f, "takeoff to {altitude}m"),
            CommandIntent::Land => write!(f, "land"),
            CommandIntent::Move { direction, speed } => write!(f, "move {direction} at {speed}m/s"),
            CommandIntent::Hover => write!(f, "hover"),
        }
    }
}
