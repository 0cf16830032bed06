//! WebSocket connection: negotiation, observer slots, and pump wiring.

use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hublink_protocol::constants::{WS_MAX_MESSAGE_SIZE, targets};
use hublink_protocol::{AttachRequest, ChatMessage, ConnectionState, Envelope, NotificationMessage};

use crate::config::{HubConfig, TransportPreference};
use crate::error::HubError;
use crate::transport::{
    Callback, ClientConnection, DisconnectInfo, Negotiated, StateChange, TransportFault,
    VoidCallback,
};

/// Transport name negotiated by this implementation.
pub(crate) const TRANSPORT_NAME: &str = "webSockets";

/// Errors from the WebSocket connection.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed")]
    Closed,

    #[error("transport {0} is not available")]
    UnsupportedTransport(&'static str),
}

impl From<WsError> for HubError {
    fn from(e: WsError) -> Self {
        HubError::ConnectionFailure {
            reason: e.to_string(),
        }
    }
}

type Slot<T> = Mutex<Option<T>>;

/// Observer slots. One callback per event; registration replaces.
#[derive(Default)]
pub(crate) struct Observers {
    pub(crate) starting: Slot<VoidCallback>,
    pub(crate) received: Slot<Callback<serde_json::Value>>,
    pub(crate) slow: Slot<VoidCallback>,
    pub(crate) reconnecting: Slot<VoidCallback>,
    pub(crate) reconnected: Slot<Callback<Negotiated>>,
    pub(crate) state_changed: Slot<Callback<StateChange>>,
    pub(crate) disconnected: Slot<Callback<DisconnectInfo>>,
    pub(crate) error: Slot<Callback<TransportFault>>,
    pub(crate) chat: Slot<Callback<ChatMessage>>,
    pub(crate) notification: Slot<Callback<NotificationMessage>>,
}

/// State shared between the connection and its pumps.
pub(crate) struct ConnShared {
    pub(crate) observers: Observers,
    state: RwLock<ConnectionState>,
    last_error: Mutex<Option<String>>,
}

impl ConnShared {
    pub(crate) fn new() -> Self {
        Self {
            observers: Observers::default(),
            state: RwLock::new(ConnectionState::Disconnected),
            last_error: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        match self.state.read() {
            Ok(guard) => *guard,
            Err(_) => ConnectionState::Disconnected,
        }
    }

    /// Transitions the state and fires the state-changed observer.
    /// No-op when the state does not change.
    pub(crate) fn set_state(&self, new: ConnectionState) {
        let old = match self.state.write() {
            Ok(mut guard) => {
                let old = *guard;
                *guard = new;
                old
            }
            Err(_) => return,
        };
        if old == new {
            return;
        }
        if let Ok(guard) = self.observers.state_changed.lock()
            && let Some(cb) = guard.as_ref()
        {
            cb(StateChange {
                old_code: old.code(),
                new_code: new.code(),
            });
        }
    }

    pub(crate) fn record_error(&self, message: impl Into<String>) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = Some(message.into());
        }
    }

    pub(crate) fn fire_starting(&self) {
        if let Ok(guard) = self.observers.starting.lock()
            && let Some(cb) = guard.as_ref()
        {
            cb();
        }
    }

    pub(crate) fn fire_received(&self, payload: serde_json::Value) {
        if let Ok(guard) = self.observers.received.lock()
            && let Some(cb) = guard.as_ref()
        {
            cb(payload);
        }
    }

    pub(crate) fn fire_slow(&self) {
        if let Ok(guard) = self.observers.slow.lock()
            && let Some(cb) = guard.as_ref()
        {
            cb();
        }
    }

    pub(crate) fn fire_reconnecting(&self) {
        if let Ok(guard) = self.observers.reconnecting.lock()
            && let Some(cb) = guard.as_ref()
        {
            cb();
        }
    }

    pub(crate) fn fire_reconnected(&self, negotiated: Negotiated) {
        if let Ok(guard) = self.observers.reconnected.lock()
            && let Some(cb) = guard.as_ref()
        {
            cb(negotiated);
        }
    }

    pub(crate) fn fire_error(&self, fault: TransportFault) {
        if let Ok(guard) = self.observers.error.lock()
            && let Some(cb) = guard.as_ref()
        {
            cb(fault);
        }
    }

    pub(crate) fn fire_chat(&self, msg: ChatMessage) {
        if let Ok(guard) = self.observers.chat.lock()
            && let Some(cb) = guard.as_ref()
        {
            cb(msg);
        }
    }

    pub(crate) fn fire_notification(&self, msg: NotificationMessage) {
        if let Ok(guard) = self.observers.notification.lock()
            && let Some(cb) = guard.as_ref()
        {
            cb(msg);
        }
    }

    /// Fires the disconnected observer with the last recorded error.
    pub(crate) fn fire_disconnected(&self) {
        let reason = match self.last_error.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        self.set_state(ConnectionState::Disconnected);
        if let Ok(guard) = self.observers.disconnected.lock()
            && let Some(cb) = guard.as_ref()
        {
            cb(DisconnectInfo { reason });
        }
    }
}

/// A WebSocket connection to a named hub.
///
/// Created unstarted by [`super::WebSocketTransport::open`]; `start`
/// performs the handshake and spawns the read, write, and ping pumps.
/// This transport never recovers on its own; recovery is driven from
/// outside, and a renewed `start` on an already-negotiated handle is
/// reported through the reconnecting/reconnected observers.
pub struct WsConnection {
    url: String,
    hub: String,
    shared: Arc<ConnShared>,
    connection_id: RwLock<Option<String>>,
    transport_name: RwLock<Option<String>>,
    cancel: Mutex<Option<CancellationToken>>,
    pumps: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl WsConnection {
    pub(crate) fn new(config: &HubConfig) -> Self {
        Self {
            url: super::ws_url(&config.connection_url()),
            hub: config.hub_name.clone(),
            shared: Arc::new(ConnShared::new()),
            connection_id: RwLock::new(None),
            transport_name: RwLock::new(None),
            cancel: Mutex::new(None),
            pumps: Mutex::new(Vec::new()),
        }
    }

    /// Cancels and aborts pumps from a previous start, if any.
    fn teardown(&self) {
        if let Ok(mut guard) = self.cancel.lock()
            && let Some(token) = guard.take()
        {
            token.cancel();
        }
        if let Ok(mut guard) = self.pumps.lock() {
            for handle in guard.drain(..) {
                handle.abort();
            }
        }
    }

    async fn start_inner(&self, preference: TransportPreference) -> Result<Negotiated, WsError> {
        let transport = match preference {
            TransportPreference::Auto | TransportPreference::WebSockets => TRANSPORT_NAME,
            TransportPreference::ServerSentEvents => {
                return Err(WsError::UnsupportedTransport("serverSentEvents"));
            }
            TransportPreference::LongPolling => {
                return Err(WsError::UnsupportedTransport("longPolling"));
            }
        };

        // A start on an already-negotiated handle is a reconnect.
        let resuming = match self.connection_id.read() {
            Ok(guard) => guard.is_some(),
            Err(_) => false,
        };

        self.teardown();
        if resuming {
            self.shared.fire_reconnecting();
            self.shared.set_state(ConnectionState::Reconnecting);
        } else {
            self.shared.fire_starting();
            self.shared.set_state(ConnectionState::Connecting);
        }

        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
        let (ws_stream, _) =
            tokio_tungstenite::connect_async_with_config(self.url.as_str(), Some(ws_config), false)
                .await?;
        let (write, read) = ws_stream.split();

        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(256);
        let cancel = CancellationToken::new();

        let write_handle = {
            let shared = self.shared.clone();
            let cancel = cancel.clone();
            tokio::spawn(super::pumps::write::write_pump(
                write, write_rx, shared, cancel,
            ))
        };
        let read_handle = {
            let shared = self.shared.clone();
            let write_tx = write_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(super::pumps::read::read_pump(
                read, shared, write_tx, cancel,
            ))
        };
        let ping_handle = {
            let write_tx = write_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(super::pumps::ping::ping_pump(write_tx, cancel))
        };

        if let Ok(mut guard) = self.cancel.lock() {
            *guard = Some(cancel);
        }
        if let Ok(mut guard) = self.pumps.lock() {
            guard.extend([read_handle, write_handle, ping_handle]);
        }

        let connection_id = uuid::Uuid::new_v4().to_string();
        let attach = Envelope::new(
            targets::ATTACH,
            Some(&AttachRequest {
                hub: self.hub.clone(),
                connection_id: connection_id.clone(),
            }),
        )?;
        let json = serde_json::to_string(&attach)?;
        write_tx
            .send(tungstenite::Message::Text(json.into()))
            .await
            .map_err(|_| WsError::Closed)?;

        if let Ok(mut guard) = self.connection_id.write() {
            *guard = Some(connection_id.clone());
        }
        if let Ok(mut guard) = self.transport_name.write() {
            *guard = Some(transport.to_string());
        }

        self.shared.set_state(ConnectionState::Connected);
        debug!(url = %self.url, hub = %self.hub, id = %connection_id, "attached to hub");

        let negotiated = Negotiated {
            connection_id,
            transport: transport.to_string(),
        };
        if resuming {
            self.shared.fire_reconnected(negotiated.clone());
        }
        Ok(negotiated)
    }
}

#[async_trait]
impl ClientConnection for WsConnection {
    fn on_starting(&self, cb: VoidCallback) {
        if let Ok(mut guard) = self.shared.observers.starting.lock() {
            *guard = Some(cb);
        }
    }

    fn on_received(&self, cb: Callback<serde_json::Value>) {
        if let Ok(mut guard) = self.shared.observers.received.lock() {
            *guard = Some(cb);
        }
    }

    fn on_slow(&self, cb: VoidCallback) {
        if let Ok(mut guard) = self.shared.observers.slow.lock() {
            *guard = Some(cb);
        }
    }

    fn on_reconnecting(&self, cb: VoidCallback) {
        if let Ok(mut guard) = self.shared.observers.reconnecting.lock() {
            *guard = Some(cb);
        }
    }

    fn on_reconnected(&self, cb: Callback<Negotiated>) {
        if let Ok(mut guard) = self.shared.observers.reconnected.lock() {
            *guard = Some(cb);
        }
    }

    fn on_state_changed(&self, cb: Callback<StateChange>) {
        if let Ok(mut guard) = self.shared.observers.state_changed.lock() {
            *guard = Some(cb);
        }
    }

    fn on_disconnected(&self, cb: Callback<DisconnectInfo>) {
        if let Ok(mut guard) = self.shared.observers.disconnected.lock() {
            *guard = Some(cb);
        }
    }

    fn on_error(&self, cb: Callback<TransportFault>) {
        if let Ok(mut guard) = self.shared.observers.error.lock() {
            *guard = Some(cb);
        }
    }

    fn on_chat(&self, cb: Callback<ChatMessage>) {
        if let Ok(mut guard) = self.shared.observers.chat.lock() {
            *guard = Some(cb);
        }
    }

    fn on_notification(&self, cb: Callback<NotificationMessage>) {
        if let Ok(mut guard) = self.shared.observers.notification.lock() {
            *guard = Some(cb);
        }
    }

    async fn start(&self, preference: TransportPreference) -> Result<Negotiated, HubError> {
        match self.start_inner(preference).await {
            Ok(negotiated) => Ok(negotiated),
            Err(e) => {
                self.teardown();
                self.shared.set_state(ConnectionState::Disconnected);
                Err(e.into())
            }
        }
    }

    fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    fn connection_id(&self) -> Option<String> {
        match self.connection_id.read() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        }
    }

    fn transport_name(&self) -> Option<String> {
        match self.transport_name.read() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        }
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.teardown();
    }
}
