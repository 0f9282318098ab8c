use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::PartyDirectory;

/// Run [`PartyDirectory::poll_once`] every `interval` until shutdown
///
/// The first cycle runs immediately. A cycle in flight is abandoned when the
/// shutdown signal fires; nothing it merged so far is lost.
pub fn spawn_poller(
    directory: Arc<PartyDirectory>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(?interval, "directory poller started");

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = directory.poll_once() => {}
                    }
                }
            }
        }

        tracing::info!("directory poller stopped");
    })
}
