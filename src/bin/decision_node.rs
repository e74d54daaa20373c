use drone_relay::decision::run_decision_node;
use drone_relay::util::{DecisionConfig, cancel_on_ctrl_c};
use drone_relay::{error, info};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> ExitCode {
    let cfg = match DecisionConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Starting decision node: broker {}:{}, period {}ms, thresholds {}/{}.",
        cfg.broker.host,
        cfg.broker.port,
        cfg.period.as_millis(),
        cfg.thresholds.obstacle,
        cfg.thresholds.anomaly
    );

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());
    match run_decision_node(cfg, shutdown).await {
        Ok(()) => {
            info!("Decision node stopped.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Decision node terminated: {e}");
            ExitCode::FAILURE
        }
    }
}
