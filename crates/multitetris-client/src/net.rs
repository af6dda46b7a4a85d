use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use multitetris_core::net::messages::{ClientMessage, ServerMessage};
use multitetris_core::net::protocol::{decode_server_message, encode_client_message};

use crate::error::ClientError;

/// Outbound queue depth. Snapshots are full overwrites, so a short queue is enough.
const OUTBOUND_BUFFER: usize = 64;

/// Handle to a live server connection. Dropping `outbound` closes the socket.
pub struct ServerConnection {
    pub outbound: mpsc::Sender<ClientMessage>,
    pub inbound: mpsc::Receiver<ServerMessage>,
}

impl ServerConnection {
    /// Queue a message without waiting. Returns false if it was dropped.
    pub fn send(&self, msg: ClientMessage) -> bool {
        match self.outbound.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::debug!(action = msg.message_type().action(), "Outbound queue full, dropped");
                false
            },
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Connect to the server and spawn reader and writer tasks.
pub async fn connect(url: &str) -> Result<ServerConnection, ClientError> {
    let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
    let (mut write, mut read) = ws.split();
    tracing::info!(url, "WebSocket connected");

    let (out_tx, mut out_rx) = mpsc::channel::<ClientMessage>(OUTBOUND_BUFFER);
    let (in_tx, in_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER * 4);

    tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let data = match encode_client_message(&msg) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode client message");
                    continue;
                },
            };
            if write.send(Message::Binary(data.into())).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            let data = match frame {
                Ok(Message::Binary(data)) => data,
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            };
            match decode_server_message(&data) {
                Ok(msg) => {
                    if in_tx.send(msg).await.is_err() {
                        break;
                    }
                },
                Err(e) => tracing::debug!(error = %e, "Dropped undecodable server frame"),
            }
        }
        tracing::info!("Server connection closed");
    });

    Ok(ServerConnection {
        outbound: out_tx,
        inbound: in_rx,
    })
}
