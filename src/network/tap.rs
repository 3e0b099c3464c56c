//! WebSocket Tap
//!
//! Reads the observed game's push channel and forwards each text frame,
//! tagged with its receipt time, into a bounded channel for the engine.
//! Session establishment and reconnects belong to the external keepalive
//! layer; the tap only drains an already-reachable endpoint.

use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use futures_util::StreamExt;
use tracing::{info, warn, debug};

use crate::network::{RawFrame, FRAME_TERMINATOR};

/// Tap configuration.
#[derive(Debug, Clone)]
pub struct TapConfig {
    /// WebSocket endpoint of the observed game hub.
    pub url: String,
    /// Capacity of the frame channel toward the engine.
    pub channel_capacity: usize,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:9090/hub".to_string(),
            channel_capacity: 256,
        }
    }
}

/// Tap errors.
#[derive(Debug, thiserror::Error)]
pub enum TapError {
    /// Could not establish the WebSocket connection.
    #[error("connect failed: {0}")]
    Connect(#[source] tokio_tungstenite::tungstenite::Error),

    /// The engine side of the channel went away.
    #[error("frame receiver dropped")]
    ReceiverDropped,
}

/// Connect to the hub and forward text frames until the stream ends.
///
/// Returns `Ok(())` on a clean close from the server. Read errors end the
/// tap after logging; whether to redial is the session layer's decision.
pub async fn run_tap(config: &TapConfig, tx: mpsc::Sender<RawFrame>) -> Result<(), TapError> {
    info!("tapping {}", config.url);

    let (ws_stream, _) = connect_async(&config.url)
        .await
        .map_err(TapError::Connect)?;
    info!("tap connected");

    let (_write, mut read) = ws_stream.split();

    while let Some(msg_result) = read.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                // A single transport message may carry several terminated
                // frames back to back; forward each one on its own.
                for piece in text.split(FRAME_TERMINATOR) {
                    if piece.trim().is_empty() {
                        continue;
                    }
                    let frame = RawFrame::new(piece);
                    if tx.send(frame).await.is_err() {
                        return Err(TapError::ReceiverDropped);
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!("hub closed the connection");
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                debug!("transport keepalive");
            }
            Ok(other) => {
                debug!("ignoring non-text frame: {:?}", other);
            }
            Err(e) => {
                warn!("tap read error: {}", e);
                break;
            }
        }
    }

    info!("tap ended");
    Ok(())
}
