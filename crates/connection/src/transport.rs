//! Transport capability traits.
//!
//! The manager is written against these traits; the bundled WebSocket
//! transport implements them, and tests substitute doubles.

use std::sync::Arc;

use async_trait::async_trait;

use hublink_protocol::{ChatMessage, ConnectionState, NotificationMessage};

use crate::config::{HubConfig, TransportPreference};
use crate::error::HubError;

/// Callback with no payload.
pub type VoidCallback = Box<dyn Fn() + Send + Sync>;
/// Callback with a typed payload.
pub type Callback<T> = Box<dyn Fn(T) + Send + Sync>;

/// Outcome of a successful transport negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct Negotiated {
    pub connection_id: String,
    pub transport: String,
}

/// State transition reported by a connection, as raw wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub old_code: i32,
    pub new_code: i32,
}

/// Details of a lost connection.
#[derive(Debug, Clone, PartialEq)]
pub struct DisconnectInfo {
    /// Last known error message, if any.
    pub reason: Option<String>,
}

/// Runtime transport fault, with the payload that was in flight when the
/// fault occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFault {
    pub message: String,
    pub in_flight: Option<serde_json::Value>,
}

/// A single connection to a named hub, created unstarted.
///
/// Observer registrations are single-slot: registering a callback for an
/// event replaces any previous one. The reconnecting and reconnected
/// observers are fired only by transports that perform their own
/// transparent recovery.
#[async_trait]
pub trait ClientConnection: Send + Sync {
    fn on_starting(&self, cb: VoidCallback);
    fn on_received(&self, cb: Callback<serde_json::Value>);
    fn on_slow(&self, cb: VoidCallback);
    fn on_reconnecting(&self, cb: VoidCallback);
    fn on_reconnected(&self, cb: Callback<Negotiated>);
    fn on_state_changed(&self, cb: Callback<StateChange>);
    fn on_disconnected(&self, cb: Callback<DisconnectInfo>);
    fn on_error(&self, cb: Callback<TransportFault>);
    fn on_chat(&self, cb: Callback<ChatMessage>);
    fn on_notification(&self, cb: Callback<NotificationMessage>);

    /// Negotiates the transport and attaches to the hub.
    async fn start(&self, preference: TransportPreference) -> Result<Negotiated, HubError>;

    fn state(&self) -> ConnectionState;
    fn connection_id(&self) -> Option<String>;
    fn transport_name(&self) -> Option<String>;
}

/// Capability for opening connections. Injected via
/// [`crate::env::Environment`].
pub trait Transport: Send + Sync {
    /// Builds an unstarted connection bound to the configured URL and hub.
    fn open(&self, config: &HubConfig) -> Result<Arc<dyn ClientConnection>, HubError>;
}
