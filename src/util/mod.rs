mod config;
pub mod logger;
mod shutdown;
mod supervise;


pub use config::{BrokerConfig, ConfigError, DecisionConfig, EdgeConfig, SerialConfig};
pub use shutdown::cancel_on_ctrl_c;
pub(crate) use supervise::supervise;
