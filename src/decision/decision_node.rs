use super::{DecisionEngine, DecisionPolicy, TelemetryIntake, telemetry_slot};
use crate::bus::{BusSession, BusTransport};
use crate::util::{DecisionConfig, supervise};
use crate::{NodeError, info};
use tokio_util::sync::CancellationToken;

/// Connects the decision node to the broker and runs it until shutdown or bus loss.
///
/// # Errors
/// Fails on bus connect failure and when the bus session is lost.
pub async fn run_decision_node(
    cfg: DecisionConfig,
    shutdown: CancellationToken,
) -> Result<(), NodeError> {
    let session = BusSession::connect(&cfg.broker).await?;
    let (writer, reader) = telemetry_slot();
    let policy = DecisionPolicy {
        thresholds: cfg.thresholds,
        cruise_speed: cfg.cruise_speed,
        retreat_speed: cfg.retreat_speed,
    };
    let engine = DecisionEngine::new(
        reader,
        session.publisher(),
        cfg.broker.command_topic.as_str(),
        policy,
        cfg.period,
    );
    serve_decision(session, TelemetryIntake::new(writer), engine, &cfg.broker.data_topic, shutdown)
        .await
}

/// Feeds the data topic into the slot, spawns the engine and dispatches bus
/// traffic until the session ends.
///
/// # Errors
/// Returns the error that ended the bus session, or [`NodeError::LoopStopped`] if the
/// engine dies first.
pub async fn serve_decision<T: BusTransport>(
    mut session: BusSession<T>,
    intake: TelemetryIntake,
    engine: DecisionEngine,
    data_topic: &str,
    shutdown: CancellationToken,
) -> Result<(), NodeError> {
    session.subscribe(data_topic, intake).await?;

    let engine_shutdown = shutdown.child_token();
    let engine_task = tokio::spawn(engine.run(engine_shutdown.clone()));
    info!("Decision node started. Waiting for sensor data...");

    supervise(session.run(shutdown), "decision engine", engine_task, engine_shutdown).await
}
