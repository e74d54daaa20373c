//! Decision side of the control loop: the latest-telemetry slot, per-sensor
//! feature extraction and the periodic engine that turns features into commands.

mod bandpass;
mod decision_engine;
mod decision_node;
mod signal_pipeline;
mod telemetry_slot;

#[cfg(test)]
mod tests;

pub use bandpass::BandPass;
pub use decision_engine::{
    CycleOutcome, DecisionEngine, DecisionError, DecisionPolicy, Features, Thresholds, decide,
    extract_features,
};
pub use decision_node::{run_decision_node, serve_decision};
pub use signal_pipeline::{
    GprPipeline, IndexSet, LidarPipeline, PipelineError, SignalPipeline, parse_samples,
    threshold_crossings,
};
pub use telemetry_slot::{SlotReader, SlotWriter, TelemetryIntake, telemetry_slot};
