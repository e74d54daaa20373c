use super::{CommandExecutor, EdgeSensorLoop, SensorTiming, UdpConnector};
use crate::bus::{BusSession, BusTransport};
use crate::link::{Connector, LineSource, ReconnectingLineReader, SerialConnector};
use crate::util::{EdgeConfig, supervise};
use crate::{NodeError, info};
use tokio_util::sync::CancellationToken;

/// Connects the edge node to the broker and runs it until shutdown or bus loss.
///
/// # Errors
/// Fails on an invalid actuator connection string, on bus connect failure and
/// when the bus session is lost.
pub async fn run_edge_node(cfg: EdgeConfig, shutdown: CancellationToken) -> Result<(), NodeError> {
    let actuator = UdpConnector::parse(&cfg.actuator_addr)?;
    let session = BusSession::connect(&cfg.broker).await?;

    let executor = CommandExecutor::new(
        actuator,
        cfg.actuator_retry,
        cfg.actuator_lifetime,
        cfg.command_defaults,
    );
    let sensor_loop = EdgeSensorLoop::new(
        ReconnectingLineReader::new(
            SerialConnector::new("LiDAR", cfg.lidar.port.as_str(), cfg.lidar.baud_rate),
            cfg.sensor_attempt_timeout,
        ),
        ReconnectingLineReader::new(
            SerialConnector::new("GPR", cfg.gpr.port.as_str(), cfg.gpr.baud_rate),
            cfg.sensor_attempt_timeout,
        ),
        session.publisher(),
        cfg.broker.data_topic.as_str(),
        SensorTiming {
            period: cfg.sensor_period,
            read_timeout: cfg.sensor_read_timeout,
            retry_delay: cfg.sensor_retry_delay,
        },
    );
    info!(
        "Actuator connect sequence may take up to {}s per command.",
        cfg.actuator_retry.worst_case().as_secs()
    );
    serve_edge(session, sensor_loop, executor, &cfg.broker.command_topic, shutdown).await
}

/// Wires the command executor to the command topic, spawns the sensor loop and
/// dispatches bus traffic until the session ends.
///
/// # Errors
/// Returns the error that ended the bus session, or [`NodeError::LoopStopped`] if the
/// sensor loop dies first.
pub async fn serve_edge<T, S, A>(
    mut session: BusSession<T>,
    sensor_loop: EdgeSensorLoop<S>,
    executor: CommandExecutor<A>,
    command_topic: &str,
    shutdown: CancellationToken,
) -> Result<(), NodeError>
where
    T: BusTransport,
    S: Connector + 'static,
    S::Link: LineSource + 'static,
    A: Connector + 'static,
    A::Link: super::ActuatorLink + 'static,
{
    session.subscribe(command_topic, executor).await?;

    let sensor_shutdown = shutdown.child_token();
    let sensor_task = tokio::spawn(sensor_loop.run(sensor_shutdown.clone()));
    info!("Edge node started. Waiting for commands...");

    supervise(session.run(shutdown), "sensor loop", sensor_task, sensor_shutdown).await
}
