use crate::{error, info};
use tokio_util::sync::CancellationToken;

/// Cancels `token` on the first ctrl-c.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received. Stopping.");
                token.cancel();
            }
            Err(e) => error!("Unable to listen for the shutdown signal: {e}"),
        }
    });
}
