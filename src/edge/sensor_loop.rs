use crate::bus::BusPublisher;
use crate::link::{Connector, LineSource, ReconnectingLineReader};
use crate::protocol::{TelemetryMessage, now_timestamp};
use crate::{event, info, warn};
use std::{sync::Arc, time::Duration};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Cadence and bounds of the edge sensor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorTiming {
    pub period: Duration,
    /// Overall bound for one sensor per cycle.
    pub read_timeout: Duration,
    pub retry_delay: Duration,
}

/// Polls both sensors once per period and publishes one combined telemetry message.
///
/// A sensor that yields nothing shows up as an empty field; the cycle is never skipped.
pub struct EdgeSensorLoop<C>
where
    C: Connector,
    C::Link: LineSource,
{
    lidar: ReconnectingLineReader<C>,
    gpr: ReconnectingLineReader<C>,
    publisher: Arc<dyn BusPublisher>,
    topic: String,
    timing: SensorTiming,
    last_timestamp: f64,
}

impl<C> EdgeSensorLoop<C>
where
    C: Connector,
    C::Link: LineSource,
{
    pub fn new(
        lidar: ReconnectingLineReader<C>,
        gpr: ReconnectingLineReader<C>,
        publisher: Arc<dyn BusPublisher>,
        topic: impl Into<String>,
        timing: SensorTiming,
    ) -> Self {
        Self { lidar, gpr, publisher, topic: topic.into(), timing, last_timestamp: f64::MIN }
    }

    /// Runs one acquisition cycle and returns the message that was published
    /// (or attempted).
    pub async fn cycle(&mut self) -> TelemetryMessage {
        let lidar = self.lidar.poll_line(self.timing.read_timeout, self.timing.retry_delay).await;
        let gpr = self.gpr.poll_line(self.timing.read_timeout, self.timing.retry_delay).await;

        // wall clock may step backwards; telemetry timestamps may not
        let timestamp = now_timestamp().max(self.last_timestamp);
        self.last_timestamp = timestamp;

        let msg = TelemetryMessage::new(lidar, gpr, timestamp);
        let missing = msg.missing_sensors();
        if !missing.is_empty() {
            warn!("Publishing partial telemetry, no data from: {}.", missing.join(", "));
        }
        let payload = msg.to_envelope().serialize();
        event!("Telemetry payload: {}", String::from_utf8_lossy(&payload));
        match self.publisher.publish(&self.topic, payload) {
            Ok(()) => info!("Published sensor data at {timestamp:.3}."),
            Err(e) => warn!("Sensor data at {timestamp:.3} not published: {e}."),
        }
        msg
    }

    /// Cycles at the configured period until `shutdown` fires.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut ticker = interval(self.timing.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.cycle().await;
        }
        info!("Sensor loop stopped.");
    }
}
