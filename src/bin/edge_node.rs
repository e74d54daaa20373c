use drone_relay::edge::run_edge_node;
use drone_relay::util::{EdgeConfig, cancel_on_ctrl_c};
use drone_relay::{error, info};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> ExitCode {
    let cfg = match EdgeConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Starting edge node: broker {}:{}, LiDAR {}, GPR {}, actuator {}.",
        cfg.broker.host, cfg.broker.port, cfg.lidar.port, cfg.gpr.port, cfg.actuator_addr
    );

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());
    match run_edge_node(cfg, shutdown).await {
        Ok(()) => {
            info!("Edge node stopped.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Edge node terminated: {e}");
            ExitCode::FAILURE
        }
    }
}
