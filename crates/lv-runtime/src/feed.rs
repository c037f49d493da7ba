//! Duplex channel producer.
//!
//! Connects once, forwards every text frame to the engine in arrival order,
//! and returns when the server closes the stream. Reconnecting is the
//! caller's business; the engine only ever sees raw messages.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, trace};

use crate::handle::EngineHandle;

/// Pump messages from the WebSocket at `url` into `engine`.
///
/// Returns the number of frames forwarded once the server closes the stream.
pub async fn run_channel_feed(url: &str, engine: &EngineHandle) -> Result<u64> {
    let (mut stream, _resp) = connect_async(url)
        .await
        .with_context(|| format!("channel connect failed: {url}"))?;
    info!(url, "channel connected");

    let mut forwarded: u64 = 0;
    while let Some(frame) = stream.next().await {
        match frame.context("channel read failed")? {
            Message::Text(text) => {
                engine.ingest(text).await?;
                forwarded += 1;
            }
            Message::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    engine.ingest(text).await?;
                    forwarded += 1;
                }
                Err(_) => trace!("dropping non-utf8 binary frame"),
            },
            Message::Close(frame) => {
                info!(?frame, "channel closed by server");
                break;
            }
            // Pings are answered by tungstenite itself.
            _ => {}
        }
    }

    info!(url, forwarded, "channel feed ended");
    Ok(forwarded)
}
