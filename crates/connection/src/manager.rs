//! Connection manager for a single persistent hub connection.
//!
//! Opens a connection to a named hub through the injected transport
//! capability, registers the lifecycle and message observers, exposes
//! read-only connection status, and schedules delayed reconnects after
//! disconnection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info};

use hublink_protocol::{ChatMessage, ConnectionState, NotificationMessage};

use crate::config::HubConfig;
use crate::env::Environment;
use crate::error::HubError;
use crate::reconnect::{ManagerCtx, ReconnectPolicy, cancel_any_reconnect, wire_observers};

/// Sentinel returned by [`ConnectionManager::connection_id`] when no
/// connection identifier exists.
pub const NO_CONNECTION_ID: &str = "-1";

/// Sentinel returned by [`ConnectionManager::transport_name`] when no
/// transport is active.
pub const NO_TRANSPORT: &str = "None";

/// Capacity of the internal message fan-out channel. Lagging subscribers
/// lose the oldest messages.
const MESSAGE_FANOUT_CAPACITY: usize = 64;

/// Application message fanned out to internal subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Chat(ChatMessage),
    Notification(NotificationMessage),
}

/// Manager for a single persistent hub connection.
pub struct ConnectionManager {
    ctx: ManagerCtx,
}

impl ConnectionManager {
    /// Builds a manager with the default reconnect policy: a fixed delay
    /// of `config.reconnect_delay` before every attempt, unbounded.
    ///
    /// Fails with [`HubError::Environment`] when the environment exposes
    /// no transport capability; nothing is registered in that case.
    pub fn init(config: HubConfig, env: &Environment) -> Result<Self, HubError> {
        let policy = ReconnectPolicy::fixed(config.reconnect_delay);
        Self::init_with_policy(config, env, policy)
    }

    /// Builds a manager with an explicit reconnect policy.
    pub fn init_with_policy(
        config: HubConfig,
        env: &Environment,
        policy: ReconnectPolicy,
    ) -> Result<Self, HubError> {
        let transport = env.transport().ok_or(HubError::Environment)?;
        let sink = env.sink_for(config.logging_enabled);
        let (messages_tx, _) = broadcast::channel(MESSAGE_FANOUT_CAPACITY);

        let ctx = ManagerCtx {
            config: Arc::new(config),
            transport,
            sink,
            handle: Arc::new(RwLock::new(None)),
            policy,
            reconnect_cancel: Arc::new(Mutex::new(None)),
            stopped: Arc::new(AtomicBool::new(false)),
            messages_tx,
        };

        let conn = ctx.transport.open(&ctx.config)?;
        wire_observers(&ctx, &conn);
        ctx.replace_handle(Some(conn));
        debug!(hub = %ctx.config.hub_name, "connection manager initialised");

        Ok(Self { ctx })
    }

    /// Starts the connection. Fire-and-forget: completion is reported via
    /// `connectionDone`/`connectionFail` sink records, and a failure on
    /// this path alone does not retry.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_connection(&self) {
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            let conn = match ctx.handle.read() {
                Ok(guard) => guard.clone(),
                Err(_) => None,
            };
            let Some(conn) = conn else {
                ctx.emit("connectionFail", json!({ "error": "no connection handle" }));
                return;
            };
            match conn.start(ctx.config.transport).await {
                Ok(negotiated) => {
                    info!(
                        connection_id = %negotiated.connection_id,
                        transport = %negotiated.transport,
                        "connected"
                    );
                    ctx.emit(
                        "connectionDone",
                        json!({
                            "connectionId": negotiated.connection_id,
                            "transport": negotiated.transport,
                        }),
                    );
                }
                Err(e) => {
                    ctx.emit("connectionFail", json!({ "error": e.to_string() }));
                }
            }
        });
    }

    /// True iff the live connection reports
    /// [`ConnectionState::Connected`].
    pub fn is_connected(&self) -> bool {
        match self.ctx.handle.read() {
            Ok(guard) => guard
                .as_ref()
                .is_some_and(|conn| conn.state() == ConnectionState::Connected),
            Err(_) => false,
        }
    }

    /// The live connection identifier, or `"-1"` when none exists.
    pub fn connection_id(&self) -> String {
        match self.ctx.handle.read() {
            Ok(guard) => guard
                .as_ref()
                .and_then(|conn| conn.connection_id())
                .unwrap_or_else(|| NO_CONNECTION_ID.into()),
            Err(_) => NO_CONNECTION_ID.into(),
        }
    }

    /// The active transport name, or `"None"` when none is active.
    pub fn transport_name(&self) -> String {
        match self.ctx.handle.read() {
            Ok(guard) => guard
                .as_ref()
                .and_then(|conn| conn.transport_name())
                .unwrap_or_else(|| NO_TRANSPORT.into()),
            Err(_) => NO_TRANSPORT.into(),
        }
    }

    /// Subscribes to the internal message fan-out. Delivery to lagging
    /// receivers is at-most-once: the channel drops the oldest messages.
    pub fn subscribe(&self) -> broadcast::Receiver<HubMessage> {
        self.ctx.messages_tx.subscribe()
    }

    /// Stops the manager: cancels any pending reconnect, suppresses
    /// future reconnect scheduling, and drops the live connection.
    pub fn stop(&self) {
        self.ctx.stopped.store(true, Ordering::Relaxed);
        cancel_any_reconnect(&self.ctx.reconnect_cancel);
        self.ctx.replace_handle(None);
        info!("connection manager stopped");
    }
}
