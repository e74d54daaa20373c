use super::{GprPipeline, IndexSet, LidarPipeline, SignalPipeline, SlotReader};
use crate::bus::{BusError, BusPublisher};
use crate::protocol::{CommandIntent, Direction, TelemetryMessage, now_timestamp};
use crate::{error, event, info, log, warn};
use itertools::Itertools;
use std::{fmt, sync::Arc, time::Duration};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Detection thresholds. A sample counts when strictly greater.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub obstacle: f64,
    pub anomaly: f64,
}

impl Default for Thresholds {
    fn default() -> Self { Self { obstacle: 0.5, anomaly: 0.8 } }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    pub thresholds: Thresholds,
    pub cruise_speed: f64,
    pub retreat_speed: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self { Self { thresholds: Thresholds::default(), cruise_speed: 10.0, retreat_speed: 5.0 } }
}

/// What feature extraction found in one telemetry message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Features {
    pub obstacles: IndexSet,
    pub anomalies: IndexSet,
}

/// Runs both pipelines over one telemetry message.
pub fn extract_features(
    lidar: &dyn SignalPipeline,
    gpr: &dyn SignalPipeline,
    msg: &TelemetryMessage,
    thresholds: &Thresholds,
) -> Features {
    Features {
        obstacles: lidar.extract(msg.lidar(), thresholds.obstacle),
        anomalies: gpr.extract(msg.gpr(), thresholds.anomaly),
    }
}

/// Anomalies win over obstacles; with neither the drone keeps cruising.
pub fn decide(features: &Features, policy: &DecisionPolicy) -> CommandIntent {
    if !features.anomalies.is_empty() {
        CommandIntent::Hover
    } else if !features.obstacles.is_empty() {
        CommandIntent::Move { direction: Direction::Backward, speed: policy.retreat_speed }
    } else {
        CommandIntent::Move { direction: Direction::Forward, speed: policy.cruise_speed }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionError {
    /// Feature extraction or the decision itself did not complete.
    CycleFailure(String),
}

impl fmt::Display for DecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycleFailure(reason) => write!(f, "decision cycle failed: {reason}"),
        }
    }
}

impl std::error::Error for DecisionError {}

/// Result of one decision cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The slot was still empty.
    NoTelemetry,
    Emitted(CommandIntent),
    /// A command was decided but could not be handed to the bus.
    PublishFailed(CommandIntent, BusError),
    Failed(DecisionError),
}

/// Turns the newest telemetry into one command per period.
pub struct DecisionEngine {
    slot: SlotReader,
    publisher: Arc<dyn BusPublisher>,
    topic: String,
    policy: DecisionPolicy,
    period: Duration,
    lidar: Arc<dyn SignalPipeline>,
    gpr: Arc<dyn SignalPipeline>,
}

impl DecisionEngine {
    pub fn new(
        slot: SlotReader,
        publisher: Arc<dyn BusPublisher>,
        topic: impl Into<String>,
        policy: DecisionPolicy,
        period: Duration,
    ) -> Self {
        Self {
            slot,
            publisher,
            topic: topic.into(),
            policy,
            period,
            lidar: Arc::new(LidarPipeline),
            gpr: Arc::new(GprPipeline::default()),
        }
    }

    /// Replaces the default feature extraction.
    #[must_use]
    pub fn with_pipelines(
        mut self,
        lidar: Arc<dyn SignalPipeline>,
        gpr: Arc<dyn SignalPipeline>,
    ) -> Self {
        self.lidar = lidar;
        self.gpr = gpr;
        self
    }

    /// Runs one cycle: snapshot, extract, decide, publish.
    pub async fn cycle(&mut self) -> CycleOutcome {
        let Some(msg) = self.slot.snapshot() else {
            warn!("No sensor data available for analysis.");
            return CycleOutcome::NoTelemetry;
        };

        let (lidar, gpr) = (Arc::clone(&self.lidar), Arc::clone(&self.gpr));
        let policy = self.policy;
        let analysis = tokio::task::spawn_blocking(move || {
            let features = extract_features(lidar.as_ref(), gpr.as_ref(), &msg, &policy.thresholds);
            let command = decide(&features, &policy);
            (features, command)
        })
        .await;
        let (features, command) = match analysis {
            Ok(res) => res,
            Err(e) => {
                let err = DecisionError::CycleFailure(e.to_string());
                error!("{err}. No command this cycle.");
                return CycleOutcome::Failed(err);
            }
        };
        log!(
            "Obstacles at [{}], anomalies at [{}].",
            features.obstacles.iter().join(", "),
            features.anomalies.iter().join(", ")
        );

        let payload = command.to_envelope(now_timestamp()).serialize();
        event!("Command payload: {}", String::from_utf8_lossy(&payload));
        match self.publisher.publish(&self.topic, payload) {
            Ok(()) => {
                info!("Sent command: {command}.");
                CycleOutcome::Emitted(command)
            }
            Err(e) => {
                warn!("Command {command} not published: {e}.");
                CycleOutcome::PublishFailed(command, e)
            }
        }
    }

    /// Cycles at the configured period until `shutdown` fires.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.cycle().await;
        }
        info!("Decision engine stopped.");
    }
}
