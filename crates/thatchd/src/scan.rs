//! Scan-request loop: turns control-plane scan requests into sweeps.

use tokio::sync::{broadcast, mpsc};

use thatch_services::{SweepTrigger, Sweeper};

pub async fn run(
    sweeper: Sweeper,
    mut requests: mpsc::UnboundedReceiver<()>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            req = requests.recv() => match req {
                Some(()) => {
                    if sweeper.trigger() == SweepTrigger::AlreadyRunning {
                        tracing::warn!(subnet = %sweeper.subnet(), "scan request coalesced into running sweep");
                    }
                }
                None => break,
            },
        }
    }
    tracing::debug!("scan loop stopped");
}
