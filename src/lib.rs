//! Edge and decision nodes of a drone control loop relayed over MQTT.
//!
//! The edge node samples a LiDAR and a GPR sensor over serial links, publishes
//! combined telemetry and executes movement commands on the flight controller.
//! The decision node turns the newest telemetry into one command per period.

pub mod bus;
pub mod decision;
pub mod edge;
pub mod link;
mod node_error;
pub mod protocol;
pub mod util;

pub use node_error::NodeError;
