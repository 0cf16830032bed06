//! WebSocket read pump — liveness tracking and inbound dispatch.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use hublink_protocol::Envelope;
use hublink_protocol::constants::{
    WS_LIVENESS_WAIT, WS_MAX_MESSAGE_SIZE, WS_SLOW_THRESHOLD, targets,
};

use crate::ws::client::ConnShared;

/// Reads frames from the WebSocket and dispatches them to observers.
///
/// Any inbound frame resets the liveness deadline. Past
/// [`WS_SLOW_THRESHOLD`] of silence the slow observer fires once per
/// silence window; past [`WS_LIVENESS_WAIT`] the connection is considered
/// dead and the pump exits. Pump exit fires the disconnected observer
/// exactly once; cancellation is a deliberate teardown and fires nothing.
pub(crate) async fn read_pump<S>(
    mut read: S,
    shared: Arc<ConnShared>,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let liveness = tokio::time::sleep(WS_LIVENESS_WAIT);
    tokio::pin!(liveness);
    let slow = tokio::time::sleep(WS_SLOW_THRESHOLD);
    tokio::pin!(slow);
    let mut slow_fired = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,

            () = &mut liveness => {
                warn!("liveness timeout, closing");
                shared.record_error("liveness timeout");
                break;
            }

            () = &mut slow, if !slow_fired => {
                slow_fired = true;
                shared.fire_slow();
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(msg)) => {
                        let now = tokio::time::Instant::now();
                        liveness.as_mut().reset(now + WS_LIVENESS_WAIT);
                        slow.as_mut().reset(now + WS_SLOW_THRESHOLD);
                        slow_fired = false;

                        match msg {
                            tungstenite::Message::Text(text) => {
                                dispatch_text(&text, &shared);
                            }
                            tungstenite::Message::Ping(data) => {
                                trace!("received ping, sending pong");
                                let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                            }
                            tungstenite::Message::Pong(_) => {
                                trace!("received pong");
                            }
                            tungstenite::Message::Close(frame) => {
                                if let Some(frame) = frame {
                                    shared.record_error(format!("closed by hub: {}", frame.reason));
                                }
                                debug!("received close frame");
                                break;
                            }
                            _ => {} // Binary — ignore
                        }
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        shared.record_error(e.to_string());
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    shared.fire_disconnected();
}

/// Parses a text frame and dispatches it: every frame to the received
/// observer, known targets additionally to their typed observer.
fn dispatch_text(text: &str, shared: &Arc<ConnShared>) {
    if text.len() > WS_MAX_MESSAGE_SIZE {
        warn!("message too large ({} bytes), dropping", text.len());
        return;
    }

    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!("failed to parse frame: {e}");
            return;
        }
    };
    shared.fire_received(value);

    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            trace!("frame is not an envelope: {e}");
            return;
        }
    };

    match envelope.target.as_str() {
        targets::CHAT => match envelope.parse_payload() {
            Ok(Some(msg)) => shared.fire_chat(msg),
            Ok(None) => warn!("chat message without payload"),
            Err(e) => warn!("malformed chat payload: {e}"),
        },
        targets::NOTIFICATIONS => match envelope.parse_payload() {
            Ok(Some(msg)) => shared.fire_notification(msg),
            Ok(None) => warn!("notification without payload"),
            Err(e) => warn!("malformed notification payload: {e}"),
        },
        other => trace!(target = other, "frame for unhandled target"),
    }
}
