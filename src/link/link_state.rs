use strum_macros::Display;

/// Lifecycle of a sensor or actuator link handle.
///
/// `Connecting` carries the number of the attempt in progress so retry behaviour
/// can be observed from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LinkState {
    Disconnected,
    Connecting { attempt: u32 },
    Connected,
}
