use super::{
    BandPass, CycleOutcome, DecisionEngine, DecisionError, DecisionPolicy, Features,
    GprPipeline, IndexSet, LidarPipeline, PipelineError, SignalPipeline, TelemetryIntake,
    Thresholds, decide, extract_features, parse_samples, serve_decision, telemetry_slot,
    threshold_crossings,
};
use crate::bus::testing::{LoopbackHandle, LoopbackTransport, RecordingPublisher, loopback};
use crate::NodeError;
use crate::bus::{BusError, BusSession};
use crate::protocol::{CommandDefaults, CommandIntent, Direction, TelemetryMessage};
use proptest::prelude::*;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn telemetry(lidar: &str, gpr: &str) -> TelemetryMessage {
    TelemetryMessage::new(lidar.to_string(), gpr.to_string(), 1_700_000_000.5)
}

fn engine(publisher: &Arc<RecordingPublisher>) -> (super::SlotWriter, DecisionEngine) {
    let (writer, reader) = telemetry_slot();
    let engine = DecisionEngine::new(
        reader,
        publisher.clone(),
        "drone/commands",
        DecisionPolicy::default(),
        Duration::from_secs(2),
    );
    (writer, engine)
}

fn sine(freq: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| (2.0 * PI * freq * i as f64 / BandPass::GPR_SAMPLE_RATE).sin()).collect()
}

fn peak(samples: &[f64]) -> f64 { samples.iter().fold(0.0, |acc, v| acc.max(v.abs())) }

#[test]
fn test_parse_samples() {
    assert_eq!(parse_samples("0.1, 0.2,0.9").unwrap(), vec![0.1, 0.2, 0.9]);
    assert_eq!(parse_samples("1.5,,2.5,").unwrap(), vec![1.5, 2.5]);
    assert!(parse_samples("").unwrap().is_empty());
    assert_eq!(
        parse_samples("0.1,abc").unwrap_err(),
        PipelineError::InvalidSample { index: 1, raw: "abc".to_string() }
    );
    assert_eq!(parse_samples("NaN").unwrap_err(), PipelineError::NonFinite { index: 0 });
    assert_eq!(parse_samples("1,inf").unwrap_err(), PipelineError::NonFinite { index: 1 });
}

#[test]
fn test_threshold_is_strict() {
    let samples = [0.5, 0.50001, 0.2, 0.8, 0.9];
    assert_eq!(threshold_crossings(&samples, 0.5), IndexSet::from([1, 3, 4]));
    assert_eq!(threshold_crossings(&samples, 0.9), IndexSet::new());
}

#[test]
fn test_scenario_obstacle_without_anomaly() {
    let msg = telemetry("0.1,0.2,0.9", "0.1,0.1,0.1");
    let features =
        extract_features(&LidarPipeline, &GprPipeline::default(), &msg, &Thresholds::default());
    assert_eq!(features.obstacles, IndexSet::from([2]));
    assert!(features.anomalies.is_empty());
    assert_eq!(
        decide(&features, &DecisionPolicy::default()),
        CommandIntent::Move { direction: Direction::Backward, speed: 5.0 }
    );
}

#[test]
fn test_scenario_all_below_thresholds() {
    let msg = telemetry("0.1,0.2,0.3", "0.1,0.5,0.7");
    let features =
        extract_features(&LidarPipeline, &GprPipeline::default(), &msg, &Thresholds::default());
    assert_eq!(features, Features::default());
    assert_eq!(
        decide(&features, &DecisionPolicy::default()),
        CommandIntent::Move { direction: Direction::Forward, speed: 10.0 }
    );
}

#[test]
fn test_pipeline_errors_yield_empty_sets() {
    let msg = telemetry("0.9,garbage", "");
    let features =
        extract_features(&LidarPipeline, &GprPipeline::default(), &msg, &Thresholds::default());
    assert_eq!(features, Features::default());
}

#[test]
fn test_short_gpr_trace_is_not_filtered() {
    let trace: Vec<f64> = (0..BandPass::PAD_LEN).map(|i| i as f64 * 0.1).collect();
    assert_eq!(BandPass::gpr().apply(&trace), trace);

    // a raw spike survives unfiltered and is flagged
    let raw = "0.1,0.95,0.1";
    let anomalies = GprPipeline::default().extract(raw, 0.8);
    assert_eq!(anomalies, IndexSet::from([1]));
}

#[test]
fn test_bandpass_removes_dc() {
    let filtered = BandPass::gpr().apply(&[5.0; 200]);
    assert_eq!(filtered.len(), 200);
    assert!(peak(&filtered) < 1e-6, "peak was {}", peak(&filtered));
}

#[test]
fn test_bandpass_keeps_in_band_and_rejects_out_of_band() {
    let filter = BandPass::gpr();

    let passed = filter.apply(&sine(400.0, 400));
    assert_eq!(passed.len(), 400);
    assert!(peak(&passed[100..300]) > 0.85);
    assert!(peak(&passed[100..300]) < 1.05);

    let rejected = filter.apply(&sine(1900.0, 400));
    assert!(peak(&rejected[100..300]) < 0.05);
}

#[test]
fn test_bandpass_validates_band() {
    assert!(BandPass::new(100.0, 1000.0, 4000.0).is_ok());
    for (low, high, fs) in [(0.0, 1000.0, 4000.0), (1000.0, 100.0, 4000.0), (100.0, 2000.0, 4000.0)] {
        assert_eq!(
            BandPass::new(low, high, fs).unwrap_err(),
            PipelineError::InvalidFilter { low_cut: low, high_cut: high, sample_rate: fs }
        );
    }
}

fn index_set() -> impl Strategy<Value = IndexSet> {
    prop::collection::btree_set(0usize..64, 0..8)
}

proptest! {
    #[test]
    fn anomalies_always_hover(anomalies in index_set(), obstacles in index_set()) {
        prop_assume!(!anomalies.is_empty());
        let features = Features { obstacles, anomalies };
        prop_assert_eq!(decide(&features, &DecisionPolicy::default()), CommandIntent::Hover);
    }

    #[test]
    fn obstacles_without_anomalies_retreat(obstacles in index_set()) {
        prop_assume!(!obstacles.is_empty());
        let policy = DecisionPolicy { retreat_speed: 3.5, ..DecisionPolicy::default() };
        let features = Features { obstacles, anomalies: IndexSet::new() };
        prop_assert_eq!(
            decide(&features, &policy),
            CommandIntent::Move { direction: Direction::Backward, speed: 3.5 }
        );
    }

    #[test]
    fn crossings_are_exactly_the_samples_above(samples in prop::collection::vec(-2.0f64..2.0, 0..50), threshold in -1.0f64..1.0) {
        let crossings = threshold_crossings(&samples, threshold);
        for (i, v) in samples.iter().enumerate() {
            prop_assert_eq!(crossings.contains(&i), *v > threshold);
        }
    }
}

#[tokio::test]
async fn test_empty_slot_emits_nothing() {
    let publisher = Arc::new(RecordingPublisher::default());
    let (_writer, mut engine) = engine(&publisher);

    assert_eq!(engine.cycle().await, CycleOutcome::NoTelemetry);
    assert!(publisher.sent().is_empty());
}

#[tokio::test]
async fn test_cycle_publishes_one_command() {
    let publisher = Arc::new(RecordingPublisher::default());
    let (writer, mut engine) = engine(&publisher);
    writer.store(telemetry("0.1,0.2,0.9", "0.1,0.1,0.1"));

    let expected = CommandIntent::Move { direction: Direction::Backward, speed: 5.0 };
    assert_eq!(engine.cycle().await, CycleOutcome::Emitted(expected));

    let sent = publisher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "drone/commands");
    assert_eq!(CommandIntent::parse(&sent[0].1, &CommandDefaults::default()).unwrap(), expected);
}

#[tokio::test]
async fn test_slot_keeps_only_newest_telemetry() {
    let publisher = Arc::new(RecordingPublisher::default());
    let (writer, mut engine) = engine(&publisher);
    writer.store(telemetry("0.1", "0.95"));
    writer.store(telemetry("0.1", "0.1"));

    let expected = CommandIntent::Move { direction: Direction::Forward, speed: 10.0 };
    assert_eq!(engine.cycle().await, CycleOutcome::Emitted(expected));
    // the same snapshot is evaluated again until new telemetry arrives
    assert_eq!(engine.cycle().await, CycleOutcome::Emitted(expected));
    assert_eq!(publisher.sent().len(), 2);
}

#[tokio::test]
async fn test_publish_failure_is_reported() {
    let publisher = Arc::new(RecordingPublisher::default());
    publisher.set_failing(true);
    let (writer, mut engine) = engine(&publisher);
    writer.store(telemetry("", "0.9"));

    let outcome = engine.cycle().await;
    assert!(matches!(outcome, CycleOutcome::PublishFailed(CommandIntent::Hover, BusError::Publish(_))));
}

struct PanickingPipeline;

impl SignalPipeline for PanickingPipeline {
    fn name(&self) -> &'static str { "broken" }

    fn process(&self, _raw: &str) -> Result<Vec<f64>, PipelineError> {
        panic!("sample buffer corrupted")
    }
}

#[tokio::test]
async fn test_panicking_pipeline_fails_the_cycle_only() {
    let publisher = Arc::new(RecordingPublisher::default());
    let (writer, engine) = engine(&publisher);
    let mut engine = engine.with_pipelines(Arc::new(LidarPipeline), Arc::new(PanickingPipeline));
    writer.store(telemetry("0.9", "0.9"));

    assert!(matches!(engine.cycle().await, CycleOutcome::Failed(DecisionError::CycleFailure(_))));
    assert!(publisher.sent().is_empty());

    let mut engine =
        engine.with_pipelines(Arc::new(LidarPipeline), Arc::new(GprPipeline::default()));
    assert_eq!(engine.cycle().await, CycleOutcome::Emitted(CommandIntent::Hover));
}

#[tokio::test]
async fn test_intake_ignores_malformed_telemetry() {
    let (transport, handle) = loopback();
    let (writer, reader) = telemetry_slot();
    let mut session = BusSession::new(transport);
    session.subscribe("drone/data", TelemetryIntake::new(writer)).await.unwrap();

    let good = telemetry("0.3", "0.4");
    handle.deliver("drone/data", good.to_envelope().serialize());
    handle.deliver("drone/data", b"{\"sensor\": \"telemetry\"".to_vec());
    handle.deliver("drone/data", br#"{"tag": "telemetry", "data": 7, "timestamp": 2}"#.to_vec());
    handle.drop_connection();

    let res = session.run(CancellationToken::new()).await;
    assert!(matches!(res, Err(BusError::ConnectionLost(_))));
    // writer is gone with the session; the last good value stays readable
    assert_eq!(reader.snapshot(), Some(good));
}

#[tokio::test]
async fn test_decision_node_stops_on_bus_loss() {
    let (transport, handle) = loopback();
    let session = BusSession::new(transport);
    let (writer, reader) = telemetry_slot();
    let engine = DecisionEngine::new(
        reader,
        session.publisher(),
        "drone/commands",
        DecisionPolicy::default(),
        Duration::from_millis(10),
    );

    handle.deliver("drone/data", telemetry("0.9", "0.1").to_envelope().serialize());
    handle.drop_connection();

    let res = serve_decision(
        session,
        TelemetryIntake::new(writer),
        engine,
        "drone/data",
        CancellationToken::new(),
    )
    .await;
    assert!(matches!(res, Err(NodeError::Bus(BusError::ConnectionLost(_)))));
    assert_eq!(*handle.subscriptions.lock().unwrap(), vec!["drone/data"]);
    for (topic, payload) in handle.publisher.sent() {
        assert_eq!(topic, "drone/commands");
        assert!(CommandIntent::parse(&payload, &CommandDefaults::default()).is_ok());
    }
}

#[tokio::test(start_paused = true)]
async fn test_engine_run_stops_on_shutdown() {
    let publisher = Arc::new(RecordingPublisher::default());
    let (writer, engine) = engine(&publisher);
    writer.store(telemetry("0.1", "0.1"));
    let shutdown = CancellationToken::new();

    let task = tokio::spawn(engine.run(shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(4500)).await;
    shutdown.cancel();
    task.await.unwrap();

    // ticks at 0 s, 2 s and 4 s
    assert_eq!(publisher.sent().len(), 3);
}

fn decision_parts(
    period: Duration,
) -> (BusSession<LoopbackTransport>, LoopbackHandle, TelemetryIntake, DecisionEngine) {
    let (transport, handle) = loopback();
    let session = BusSession::new(transport);
    let (writer, reader) = telemetry_slot();
    let engine = DecisionEngine::new(
        reader,
        session.publisher(),
        "drone/commands",
        DecisionPolicy::default(),
        period,
    );
    (session, handle, TelemetryIntake::new(writer), engine)
}

#[tokio::test(start_paused = true)]
async fn test_dead_engine_stops_decision_node() {
    // a zero period makes the engine's ticker panic on start
    let (session, handle, intake, engine) = decision_parts(Duration::ZERO);

    let res = serve_decision(session, intake, engine, "drone/data", CancellationToken::new()).await;
    assert!(matches!(res, Err(NodeError::LoopStopped { name: "decision engine", .. })));
    assert_eq!(*handle.subscriptions.lock().unwrap(), vec!["drone/data"]);
}

#[tokio::test(start_paused = true)]
async fn test_decision_node_shutdown_is_clean() {
    let (session, _handle, intake, engine) = decision_parts(Duration::from_secs(2));
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    assert_eq!(serve_decision(session, intake, engine, "drone/data", shutdown).await, Ok(()));
}
