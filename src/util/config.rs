//! Environment-driven node configuration.
//!
//! Every value has a compiled-in default matching the field deployment; any of them can be
//! overridden through a `DRONE_*` environment variable. Durations are given in milliseconds.

use crate::decision::Thresholds;
use crate::edge::{ConnectionLifetime, RetryPolicy};
use crate::protocol::{CommandDefaults, Direction};
use std::{env, fmt, str::FromStr, time::Duration};

const DEFAULT_BROKER_HOST: &str = "192.168.1.100";
const DEFAULT_BROKER_PORT: u16 = 1883;
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);
const DEFAULT_BUS_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_DATA_TOPIC: &str = "drone/data";
const DEFAULT_COMMAND_TOPIC: &str = "drone/commands";

const DEFAULT_LIDAR_PORT: &str = "/dev/ttyUSB1";
const DEFAULT_GPR_PORT: &str = "/dev/ttyUSB2";
const DEFAULT_SERIAL_BAUD: u32 = 115_200;
/// Overall bound for collecting one line from a sensor.
const SENSOR_READ_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_SENSOR_RETRY_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_SENSOR_PERIOD: Duration = Duration::from_secs(1);

const DEFAULT_ACTUATOR_ADDR: &str = "udp:0.0.0.0:14550";
const DEFAULT_TAKEOFF_ALTITUDE: f64 = 20.0;
const DEFAULT_SPEED: f64 = 10.0;

const DEFAULT_DECISION_PERIOD: Duration = Duration::from_secs(2);
/// Upper bound for every configured duration.
const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);
/// MQTT carries the keep-alive as a 16 bit count of seconds.
const MAX_KEEP_ALIVE: Duration = Duration::from_secs(u16::MAX as u64);

const DEFAULT_CRUISE_SPEED: f64 = 10.0;
const DEFAULT_RETREAT_SPEED: f64 = 5.0;

/// Error raised while reading the configuration at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed into the expected type.
    InvalidValue { key: &'static str, raw: String },
    /// A numeric value was parsed but is outside its valid range.
    OutOfRange { key: &'static str, raw: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key, raw } => write!(f, "invalid value {raw:?} for {key}"),
            Self::OutOfRange { key, raw } => write!(f, "value {raw:?} for {key} is out of range"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Connection parameters shared by both nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    pub data_topic: String,
    pub command_topic: String,
}

/// One line-delimited serial sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeConfig {
    pub broker: BrokerConfig,
    pub lidar: SerialConfig,
    pub gpr: SerialConfig,
    /// Per-attempt bound for a single line read.
    pub sensor_attempt_timeout: Duration,
    /// Overall bound for collecting one line from a sensor per cycle.
    pub sensor_read_timeout: Duration,
    pub sensor_retry_delay: Duration,
    pub sensor_period: Duration,
    pub actuator_addr: String,
    pub actuator_retry: RetryPolicy,
    pub actuator_lifetime: ConnectionLifetime,
    pub command_defaults: CommandDefaults,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionConfig {
    pub broker: BrokerConfig,
    pub period: Duration,
    pub thresholds: Thresholds,
    pub cruise_speed: f64,
    pub retreat_speed: f64,
}

/// Resolves configuration keys. Production code reads the process environment,
/// tests hand in a map.
struct Source<F>(F);

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match (self.0)(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, raw }),
            None => Ok(default),
        }
    }

    fn string(&self, key: &'static str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    fn out_of_range(key: &'static str, raw: impl ToString) -> ConfigError {
        ConfigError::OutOfRange { key, raw: raw.to_string() }
    }

    /// A duration of at most [`MAX_DURATION`]; zero is allowed.
    fn millis(&self, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
        let ms: u64 = self.get(key, default_ms)?;
        let value = Duration::from_millis(ms);
        if value > MAX_DURATION { Err(Self::out_of_range(key, ms)) } else { Ok(value) }
    }

    /// Like [`millis`](Self::millis), for periods and timeouts that must not be zero.
    fn nonzero_millis(&self, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        let value = self.millis(key, default)?;
        if value.is_zero() { Err(Self::out_of_range(key, 0)) } else { Ok(value) }
    }

    /// Zero disables keep-alive; anything else is whole seconds on the wire.
    fn keep_alive(&self) -> Result<Duration, ConfigError> {
        let key = "DRONE_BROKER_KEEP_ALIVE_MS";
        let value = self.millis(key, DEFAULT_KEEP_ALIVE)?;
        let valid = value.is_zero() || (value >= Duration::from_secs(1) && value <= MAX_KEEP_ALIVE);
        if valid { Ok(value) } else { Err(Self::out_of_range(key, value.as_millis())) }
    }

    fn finite(&self, key: &'static str, default: f64) -> Result<f64, ConfigError> {
        let value: f64 = self.get(key, default)?;
        if value.is_finite() { Ok(value) } else { Err(Self::out_of_range(key, value)) }
    }

    fn speed(&self, key: &'static str, default: f64) -> Result<f64, ConfigError> {
        let value = self.finite(key, default)?;
        if value >= 0.0 { Ok(value) } else { Err(Self::out_of_range(key, value)) }
    }

    fn broker(&self, default_client_id: &str) -> Result<BrokerConfig, ConfigError> {
        Ok(BrokerConfig {
            host: self.string("DRONE_BROKER_HOST", DEFAULT_BROKER_HOST),
            port: self.get("DRONE_BROKER_PORT", DEFAULT_BROKER_PORT)?,
            client_id: self.string("DRONE_CLIENT_ID", default_client_id),
            keep_alive: self.keep_alive()?,
            connect_timeout: self
                .nonzero_millis("DRONE_BROKER_CONNECT_TIMEOUT_MS", DEFAULT_BUS_CONNECT_TIMEOUT)?,
            data_topic: self.string("DRONE_DATA_TOPIC", DEFAULT_DATA_TOPIC),
            command_topic: self.string("DRONE_COMMAND_TOPIC", DEFAULT_COMMAND_TOPIC),
        })
    }
}

impl EdgeConfig {
    /// Reads the edge node configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|key| env::var(key).ok()) }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let src = Source(lookup);
        let baud_rate = src.get("DRONE_SERIAL_BAUD", DEFAULT_SERIAL_BAUD)?;
        let max_attempts: u32 = src.get("DRONE_ACTUATOR_RETRIES", RetryPolicy::DEFAULT_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                key: "DRONE_ACTUATOR_RETRIES",
                raw: max_attempts.to_string(),
            });
        }
        let sensor_read_timeout = src.nonzero_millis("DRONE_SENSOR_READ_TIMEOUT_MS", SENSOR_READ_TIMEOUT)?;
        Ok(Self {
            broker: src.broker("edge-node")?,
            lidar: SerialConfig {
                port: src.string("DRONE_LIDAR_PORT", DEFAULT_LIDAR_PORT),
                baud_rate,
            },
            gpr: SerialConfig { port: src.string("DRONE_GPR_PORT", DEFAULT_GPR_PORT), baud_rate },
            sensor_attempt_timeout: src
                .nonzero_millis("DRONE_SENSOR_ATTEMPT_TIMEOUT_MS", sensor_read_timeout)?,
            sensor_read_timeout,
            sensor_retry_delay: src
                .millis("DRONE_SENSOR_RETRY_DELAY_MS", DEFAULT_SENSOR_RETRY_DELAY)?,
            sensor_period: src.nonzero_millis("DRONE_SENSOR_PERIOD_MS", DEFAULT_SENSOR_PERIOD)?,
            actuator_addr: src.string("DRONE_ACTUATOR_ADDR", DEFAULT_ACTUATOR_ADDR),
            actuator_retry: RetryPolicy {
                max_attempts,
                backoff: src.millis("DRONE_ACTUATOR_BACKOFF_MS", RetryPolicy::DEFAULT_BACKOFF)?,
                attempt_timeout: src
                    .nonzero_millis("DRONE_ACTUATOR_HEARTBEAT_MS", RetryPolicy::DEFAULT_ATTEMPT_TIMEOUT)?,
            },
            actuator_lifetime: src
                .get("DRONE_ACTUATOR_LIFETIME", ConnectionLifetime::Persistent)?,
            command_defaults: CommandDefaults {
                altitude: src.speed("DRONE_TAKEOFF_ALTITUDE", DEFAULT_TAKEOFF_ALTITUDE)?,
                speed: src.speed("DRONE_DEFAULT_SPEED", DEFAULT_SPEED)?,
                direction: Direction::Forward,
            },
        })
    }
}

impl DecisionConfig {
    /// Reads the decision node configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|key| env::var(key).ok()) }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let src = Source(lookup);
        let defaults = Thresholds::default();
        Ok(Self {
            broker: src.broker("decision-node")?,
            period: src.nonzero_millis("DRONE_DECISION_PERIOD_MS", DEFAULT_DECISION_PERIOD)?,
            thresholds: Thresholds {
                obstacle: src.finite("DRONE_OBSTACLE_THRESHOLD", defaults.obstacle)?,
                anomaly: src.finite("DRONE_ANOMALY_THRESHOLD", defaults.anomaly)?,
            },
            cruise_speed: src.speed("DRONE_CRUISE_SPEED", DEFAULT_CRUISE_SPEED)?,
            retreat_speed: src.speed("DRONE_RETREAT_SPEED", DEFAULT_RETREAT_SPEED)?,
        })
    }
}
