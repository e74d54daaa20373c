//! The edge node: sensor acquisition and command execution.
//!
//! The sensor loop and the command executor share no state; they only meet on the bus.

mod actuator_handle;
mod actuator_link;
mod command_executor;
mod edge_node;
mod sensor_loop;
mod udp_actuator;


pub use actuator_handle::{ActuatorError, ActuatorHandle, RetryPolicy};
pub use actuator_link::{ActuatorLink, Directive};
pub use command_executor::{CommandExecutor, ConnectionLifetime, ExecOutcome};
pub use edge_node::{run_edge_node, serve_edge};
pub use sensor_loop::{EdgeSensorLoop, SensorTiming};
pub use udp_actuator::{UdpActuatorLink, UdpConnector};
