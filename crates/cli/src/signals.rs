use flume::Sender;
use tokio::signal::unix::{SignalKind, signal};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// SIGUSR1: run a tracking pass immediately.
    TrackNow,
    /// SIGUSR2: ask the external scanner for a fresh uid list.
    RequestRescan,
    /// SIGTERM or SIGINT: shut down.
    Shutdown,
}

/// Forward process signals as events. Never returns on its own; errors
/// only when a handler cannot be installed or the receiver is gone.
pub async fn wait_for_signal(tx: Sender<SignalEvent>) -> anyhow::Result<()> {
    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut usr2 = signal(SignalKind::user_defined2())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;

    loop {
        let event = tokio::select! {
            _ = usr1.recv() => SignalEvent::TrackNow,
            _ = usr2.recv() => SignalEvent::RequestRescan,
            _ = term.recv() => SignalEvent::Shutdown,
            _ = int.recv() => SignalEvent::Shutdown,
        };
        debug!(?event, "signal received");
        tx.send_async(event).await?;
    }
}
