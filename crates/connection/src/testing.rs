//! Test doubles for the transport capability and the event sink.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use hublink_protocol::{ChatMessage, ConnectionState, NotificationMessage};

use crate::config::{HubConfig, TransportPreference};
use crate::error::HubError;
use crate::sink::{EventRecord, EventSink};
use crate::transport::{
    Callback, ClientConnection, DisconnectInfo, Negotiated, StateChange, Transport,
    TransportFault, VoidCallback,
};

/// Sink that records every emitted event.
#[derive(Default)]
pub(crate) struct RecordingSink {
    records: Mutex<Vec<EventRecord>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn methods(&self) -> Vec<&'static str> {
        self.records.lock().unwrap().iter().map(|r| r.method).collect()
    }

    pub(crate) fn fields_for(&self, method: &str) -> Option<serde_json::Value> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.method == method)
            .map(|r| r.fields.clone())
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, record: EventRecord) {
        self.records.lock().unwrap().push(record);
    }
}

/// Shared inspection state for [`MockTransport`].
#[derive(Default)]
pub(crate) struct MockShared {
    pub(crate) opens: AtomicUsize,
    pub(crate) fail_start: AtomicBool,
    pub(crate) connections: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockShared {
    pub(crate) fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn connection(&self, index: usize) -> Arc<MockConnection> {
        self.connections.lock().unwrap()[index].clone()
    }
}

/// Transport double: opens [`MockConnection`]s and counts calls.
#[derive(Default)]
pub(crate) struct MockTransport {
    pub(crate) shared: Arc<MockShared>,
}

impl Transport for MockTransport {
    fn open(&self, _config: &HubConfig) -> Result<Arc<dyn ClientConnection>, HubError> {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        let conn = Arc::new(MockConnection::new(self.shared.clone()));
        self.shared.connections.lock().unwrap().push(conn.clone());
        Ok(conn)
    }
}

type Slot<T> = Mutex<Option<T>>;

/// Connection double: records registrations and lets tests fire events.
pub(crate) struct MockConnection {
    shared: Arc<MockShared>,
    pub(crate) registered: Mutex<Vec<&'static str>>,
    starts: AtomicUsize,
    pub(crate) start_times: Mutex<Vec<tokio::time::Instant>>,
    state: Mutex<ConnectionState>,
    negotiated: Mutex<Option<Negotiated>>,

    starting: Slot<VoidCallback>,
    received: Slot<Callback<serde_json::Value>>,
    slow: Slot<VoidCallback>,
    reconnecting: Slot<VoidCallback>,
    reconnected: Slot<Callback<Negotiated>>,
    state_changed: Slot<Callback<StateChange>>,
    disconnected: Slot<Callback<DisconnectInfo>>,
    error: Slot<Callback<TransportFault>>,
    chat: Slot<Callback<ChatMessage>>,
    notification: Slot<Callback<NotificationMessage>>,
}

impl MockConnection {
    fn new(shared: Arc<MockShared>) -> Self {
        Self {
            shared,
            registered: Mutex::new(Vec::new()),
            starts: AtomicUsize::new(0),
            start_times: Mutex::new(Vec::new()),
            state: Mutex::new(ConnectionState::Disconnected),
            negotiated: Mutex::new(None),
            starting: Slot::default(),
            received: Slot::default(),
            slow: Slot::default(),
            reconnecting: Slot::default(),
            reconnected: Slot::default(),
            state_changed: Slot::default(),
            disconnected: Slot::default(),
            error: Slot::default(),
            chat: Slot::default(),
            notification: Slot::default(),
        }
    }

    pub(crate) fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn fire_disconnected(&self, reason: Option<&str>) {
        *self.state.lock().unwrap() = ConnectionState::Disconnected;
        if let Some(cb) = self.disconnected.lock().unwrap().as_ref() {
            cb(DisconnectInfo {
                reason: reason.map(String::from),
            });
        }
    }

    pub(crate) fn fire_state_changed(&self, old_code: i32, new_code: i32) {
        if let Some(cb) = self.state_changed.lock().unwrap().as_ref() {
            cb(StateChange { old_code, new_code });
        }
    }

    pub(crate) fn fire_slow(&self) {
        if let Some(cb) = self.slow.lock().unwrap().as_ref() {
            cb();
        }
    }

    pub(crate) fn fire_reconnecting(&self) {
        if let Some(cb) = self.reconnecting.lock().unwrap().as_ref() {
            cb();
        }
    }

    pub(crate) fn fire_received(&self, payload: serde_json::Value) {
        if let Some(cb) = self.received.lock().unwrap().as_ref() {
            cb(payload);
        }
    }

    pub(crate) fn fire_error(&self, fault: TransportFault) {
        if let Some(cb) = self.error.lock().unwrap().as_ref() {
            cb(fault);
        }
    }

    pub(crate) fn fire_reconnected(&self, negotiated: Negotiated) {
        if let Some(cb) = self.reconnected.lock().unwrap().as_ref() {
            cb(negotiated);
        }
    }

    pub(crate) fn fire_chat(&self, msg: ChatMessage) {
        if let Some(cb) = self.chat.lock().unwrap().as_ref() {
            cb(msg);
        }
    }

    pub(crate) fn fire_notification(&self, msg: NotificationMessage) {
        if let Some(cb) = self.notification.lock().unwrap().as_ref() {
            cb(msg);
        }
    }
}

#[async_trait]
impl ClientConnection for MockConnection {
    fn on_starting(&self, cb: VoidCallback) {
        self.registered.lock().unwrap().push("starting");
        *self.starting.lock().unwrap() = Some(cb);
    }

    fn on_received(&self, cb: Callback<serde_json::Value>) {
        self.registered.lock().unwrap().push("received");
        *self.received.lock().unwrap() = Some(cb);
    }

    fn on_slow(&self, cb: VoidCallback) {
        self.registered.lock().unwrap().push("slow");
        *self.slow.lock().unwrap() = Some(cb);
    }

    fn on_reconnecting(&self, cb: VoidCallback) {
        self.registered.lock().unwrap().push("reconnecting");
        *self.reconnecting.lock().unwrap() = Some(cb);
    }

    fn on_reconnected(&self, cb: Callback<Negotiated>) {
        self.registered.lock().unwrap().push("reconnected");
        *self.reconnected.lock().unwrap() = Some(cb);
    }

    fn on_state_changed(&self, cb: Callback<StateChange>) {
        self.registered.lock().unwrap().push("stateChanged");
        *self.state_changed.lock().unwrap() = Some(cb);
    }

    fn on_disconnected(&self, cb: Callback<DisconnectInfo>) {
        self.registered.lock().unwrap().push("disconnected");
        *self.disconnected.lock().unwrap() = Some(cb);
    }

    fn on_error(&self, cb: Callback<TransportFault>) {
        self.registered.lock().unwrap().push("error");
        *self.error.lock().unwrap() = Some(cb);
    }

    fn on_chat(&self, cb: Callback<ChatMessage>) {
        self.registered.lock().unwrap().push("chat");
        *self.chat.lock().unwrap() = Some(cb);
    }

    fn on_notification(&self, cb: Callback<NotificationMessage>) {
        self.registered.lock().unwrap().push("notification");
        *self.notification.lock().unwrap() = Some(cb);
    }

    async fn start(&self, preference: TransportPreference) -> Result<Negotiated, HubError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.start_times.lock().unwrap().push(tokio::time::Instant::now());

        if let Some(cb) = self.starting.lock().unwrap().as_ref() {
            cb();
        }

        if self.shared.fail_start.load(Ordering::SeqCst) {
            return Err(HubError::ConnectionFailure {
                reason: "refused".into(),
            });
        }

        let negotiated = Negotiated {
            connection_id: "abc123".into(),
            transport: match preference {
                TransportPreference::Auto => "webSockets".into(),
                other => other.as_str().into(),
            },
        };
        *self.state.lock().unwrap() = ConnectionState::Connected;
        *self.negotiated.lock().unwrap() = Some(negotiated.clone());
        Ok(negotiated)
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    fn connection_id(&self) -> Option<String> {
        self.negotiated
            .lock()
            .unwrap()
            .as_ref()
            .map(|n| n.connection_id.clone())
    }

    fn transport_name(&self) -> Option<String> {
        self.negotiated
            .lock()
            .unwrap()
            .as_ref()
            .map(|n| n.transport.clone())
    }
}
