use crate::ipc::{IpcCommand, IpcResponse, get_socket_path};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// A command from a client, with the channel its response goes back on
pub type IpcRequest = (IpcCommand, oneshot::Sender<IpcResponse>);

/// Guard that removes the socket file when dropped
pub struct SocketGuard {
    path: PathBuf,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if self.path.exists() {
                error!("Failed to remove socket file: {}", e);
            }
        } else {
            info!("Removed socket file at {}", self.path.display());
        }
    }
}

/// Start the IPC socket server
/// Returns a receiver for incoming requests and a guard that cleans up the socket
pub async fn start_server() -> Result<(mpsc::UnboundedReceiver<IpcRequest>, SocketGuard)> {
    start_server_at(&get_socket_path()?).await
}

async fn start_server_at(
    socket_path: &Path,
) -> Result<(mpsc::UnboundedReceiver<IpcRequest>, SocketGuard)> {
    // Remove stale socket if it exists
    if socket_path.exists() {
        info!("Removing stale socket at {}", socket_path.display());
        fs::remove_file(socket_path)?;
    }

    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("Failed to bind socket at {}", socket_path.display()))?;

    info!("IPC socket listening at {}", socket_path.display());

    let guard = SocketGuard {
        path: socket_path.to_path_buf(),
    };
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn task to accept connections
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let tx_clone = tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, tx_clone).await {
                            debug!("Client connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    });

    Ok((rx, guard))
}

/// Handle a single client connection
async fn handle_client(stream: UnixStream, tx: mpsc::UnboundedSender<IpcRequest>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    // Read one command per connection
    reader.read_line(&mut line).await?;

    let response = match line.parse::<IpcCommand>() {
        Ok(cmd) => {
            debug!("Received IPC command: {:?}", cmd);

            let (response_tx, response_rx) = oneshot::channel();
            if tx.send((cmd, response_tx)).is_err() {
                IpcResponse::Error("Daemon is shutting down".to_string())
            } else {
                response_rx
                    .await
                    .unwrap_or_else(|_| IpcResponse::Error("Daemon is shutting down".to_string()))
            }
        }
        Err(_) => {
            warn!("Unknown IPC command: {}", line.trim());
            IpcResponse::Error(format!("Unknown command: {}", line.trim()))
        }
    };

    // Send response
    let response_json = serde_json::to_string(&response)?;
    writer.write_all(response_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    Ok(())
}
