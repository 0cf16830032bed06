//! WebSocket write pump — drains queued outbound frames.

use std::sync::Arc;

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::transport::TransportFault;
use crate::ws::client::ConnShared;

/// Writes queued frames to the WebSocket. A write failure fires the error
/// observer with the frame that was in flight.
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::Receiver<tungstenite::Message>,
    shared: Arc<ConnShared>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = write_rx.recv() => {
                match msg {
                    Some(msg) => {
                        let in_flight = match &msg {
                            tungstenite::Message::Text(text) => {
                                Some(serde_json::Value::String(text.to_string()))
                            }
                            _ => None,
                        };
                        if let Err(e) = write.send(msg).await {
                            error!("WebSocket write error: {e}");
                            shared.record_error(e.to_string());
                            shared.fire_error(TransportFault {
                                message: e.to_string(),
                                in_flight,
                            });
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    let _ = write.send(tungstenite::Message::Close(None)).await;
}
