use std::path::PathBuf;
use std::sync::Arc;
use throne::{ControlEvent, ScanCoordinator};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One byte beyond the longest accepted command, so oversized writes
/// are detected without buffering them whole.
const READ_BUF: usize = throne::coordinator::MAX_COMMAND_LEN + 1;

/// Serve the scanner coordination protocol on a Unix socket. Each
/// connection gets the status line first; whatever the peer writes back
/// is handled as one command.
pub async fn serve(
    path: PathBuf,
    coordinator: Arc<ScanCoordinator>,
    control_tx: mpsc::UnboundedSender<ControlEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    // A socket file left over from a previous run blocks bind.
    match tokio::fs::remove_file(&path).await {
        Ok(()) => debug!(path = %path.display(), "removed stale socket"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let listener = UnixListener::bind(&path)?;
    debug!(path = %path.display(), "scanner socket listening");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, _addr) = accepted?;
                if let Err(err) = handle_connection(stream, &coordinator, &control_tx).await {
                    warn!(%err, "scanner connection failed");
                }
            }
        }
    }

    let _ = tokio::fs::remove_file(path).await;
    Ok(())
}

async fn handle_connection(
    mut stream: UnixStream,
    coordinator: &ScanCoordinator,
    control_tx: &mpsc::UnboundedSender<ControlEvent>,
) -> std::io::Result<()> {
    stream.write_all(coordinator.status()).await?;

    let mut buf = [0u8; READ_BUF];
    let read = stream.read(&mut buf).await?;
    if read == 0 {
        // Status-only poll.
        return Ok(());
    }

    let was_pending = coordinator.rescan_pending();
    coordinator.handle_command(&buf[..read]);
    if was_pending && !coordinator.rescan_pending() {
        // Fresh uid list available: fold it into the trust state now
        // rather than on the next interval tick.
        let _ = control_tx.send(ControlEvent::TrackNow);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use throne::NoopFlagStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn poll(path: &Path, command: Option<&[u8]>) -> Vec<u8> {
        let mut stream = UnixStream::connect(path).await.unwrap();
        let mut status = vec![0u8; 16];
        let read = stream.read(&mut status).await.unwrap();
        status.truncate(read);
        if let Some(command) = command {
            stream.write_all(command).await.unwrap();
        }
        drop(stream);
        status
    }

    #[tokio::test]
    async fn rescan_protocol_over_the_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanner.sock");
        let coordinator = ScanCoordinator::spawn(NoopFlagStore);
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let server = tokio::spawn(serve(
            path.clone(),
            Arc::clone(&coordinator),
            control_tx,
            cancel.clone(),
        ));
        while !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert_eq!(poll(&path, None).await, b"OK\n");

        coordinator.request_rescan();
        assert_eq!(poll(&path, None).await, b"RESCAN\n");
        // Polling does not acknowledge.
        assert_eq!(poll(&path, None).await, b"RESCAN\n");

        poll(&path, Some(b"UPDATED\n")).await;
        // The ack schedules an immediate tracking pass.
        let event = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            control_rx.recv(),
        )
        .await
        .unwrap();
        assert!(matches!(event, Some(ControlEvent::TrackNow)));
        assert_eq!(poll(&path, None).await, b"OK\n");

        cancel.cancel();
        let _ = server.await;
    }
}
