//! Unix domain socket server for IPC

use super::ControlRequest;
use anyhow::{bail, Context, Result};
use focus_ipc::{read_message, write_message, Command, Response};
use std::path::{Path, PathBuf};
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Bind the control socket, replacing a stale socket file but never one a
/// running timer still answers on.
pub async fn bind(path: &Path) -> Result<UnixListener> {
    if is_live(path).await {
        bail!("another focus timer is already listening on {:?}", path);
    }
    let _ = std::fs::remove_file(path);

    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind control socket at {:?}", path))?;
    info!("IPC server listening on {:?}", path);
    Ok(listener)
}

/// Accept clients until `cancel` fires, then remove the socket file.
pub async fn serve(
    listener: UnixListener,
    path: PathBuf,
    control: mpsc::Sender<ControlRequest>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let control = control.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, control).await {
                            error!("Error handling client: {:#}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }

    // Another timer may have taken the path over since we bound it
    drop(listener);
    if !is_live(&path).await {
        let _ = std::fs::remove_file(&path);
    }
    debug!("IPC server stopped");
}

async fn is_live(path: &Path) -> bool {
    UnixStream::connect(path).await.is_ok()
}

async fn handle_client(stream: UnixStream, control: mpsc::Sender<ControlRequest>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let command: Command = read_message(&mut reader).await?;
    debug!(?command, "control command received");

    let response = dispatch(command, &control).await;
    write_message(&mut writer, &response).await?;

    Ok(())
}

/// Hand a command to the timer and wait for its answer.
pub async fn dispatch(command: Command, control: &mpsc::Sender<ControlRequest>) -> Response {
    let (reply, answer) = oneshot::channel();
    if control.send(ControlRequest { command, reply }).await.is_err() {
        return Response::Error("timer is not running".to_string());
    }
    answer
        .await
        .unwrap_or_else(|_| Response::Error("timer stopped before answering".to_string()))
}
