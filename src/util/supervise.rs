use crate::bus::BusError;
use crate::{NodeError, error};
use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Drives a bus session next to the node's spawned loop. Whichever ends first ends the node.
///
/// `loop_shutdown` is cancelled once the session is over; a loop that ends before that
/// without being cancelled is reported as [`NodeError::LoopStopped`].
pub(crate) async fn supervise<S>(
    session: S,
    name: &'static str,
    mut task: JoinHandle<()>,
    loop_shutdown: CancellationToken,
) -> Result<(), NodeError>
where
    S: Future<Output = Result<(), BusError>>,
{
    let res = tokio::select! {
        res = session => res,
        joined = &mut task => {
            if loop_shutdown.is_cancelled() {
                return Ok(());
            }
            let reason = match joined {
                Ok(()) => "exited unexpectedly".to_string(),
                Err(e) => e.to_string(),
            };
            error!("{name} is gone ({reason}). Stopping node.");
            return Err(NodeError::LoopStopped { name, reason });
        }
    };

    loop_shutdown.cancel();
    if let Err(e) = task.await {
        error!("{name} task failed: {e}");
    }
    res.map_err(NodeError::from)
}
