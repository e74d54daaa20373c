use crate::link::LinkError;
use crate::protocol::{CommandIntent, Direction};
use async_trait::async_trait;
use std::fmt;

/// A one-way instruction to the flight controller. No acknowledgement is expected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Directive {
    Ascend { altitude: f64 },
    Descend,
    Move { direction: Direction, speed: f64 },
    HoldPosition,
}

impl From<CommandIntent> for Directive {
    fn from(value: CommandIntent) -> Self {
        match value {
            CommandIntent::Takeoff { altitude } => Directive::Ascend { altitude },
            CommandIntent::Land => Directive::Descend,
            CommandIntent::Move { direction, speed } => Directive::Move { direction, speed },
            CommandIntent::Hover => Directive::HoldPosition,
        }
    }
}

impl Directive {
    /// Text frame understood by the flight controller bridge.
    pub fn encode(&self) -> String {
        match self {
            Directive::Ascend { altitude } => format!("TAKEOFF {altitude}"),
            Directive::Descend => "LAND".to_string(),
            Directive::Move { direction, speed } => {
                format!("MOVE {} {speed}", direction.to_string().to_uppercase())
            }
            Directive::HoldPosition => "HOVER".to_string(),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.encode()) }
}

/// An open connection to the flight controller.
#[async_trait]
pub trait ActuatorLink: Send {
    async fn send(&mut self, directive: &Directive) -> Result<(), LinkError>;
}
