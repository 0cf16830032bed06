//! Reconnect policy and the delayed-retry loop.
//!
//! Contains the shared [`ManagerCtx`], observer wiring, cancellation
//! helpers, and the reconnect loop.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hublink_protocol::{ChatMessage, ConnectionState, NotificationMessage};

use crate::config::HubConfig;
use crate::manager::HubMessage;
use crate::sink::{EventRecord, EventSink};
use crate::transport::{
    ClientConnection, DisconnectInfo, Negotiated, StateChange, Transport, TransportFault,
};

/// Reconnect behavior: delay curve, cap, and optional attempt limit.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Cap on the delay between attempts.
    pub max_delay: Duration,
    /// Multiplier applied for each subsequent attempt.
    pub backoff_factor: f64,
    /// Attempt limit; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Fixed delay before every attempt, unbounded attempts.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            backoff_factor: 1.0,
            max_attempts: None,
        }
    }

    /// Geometric backoff from `initial` up to `max`.
    pub fn backoff(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            initial_delay: initial,
            max_delay: max,
            backoff_factor: factor,
            max_attempts: None,
        }
    }

    /// Caps the number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Delay before the given attempt (1-based), capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Shared manager state passed to observer closures and the reconnect
/// loop. Avoids threading seven separate Arc parameters.
#[derive(Clone)]
pub(crate) struct ManagerCtx {
    pub(crate) config: Arc<HubConfig>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) handle: Arc<RwLock<Option<Arc<dyn ClientConnection>>>>,
    pub(crate) policy: ReconnectPolicy,
    pub(crate) reconnect_cancel: Arc<Mutex<Option<CancellationToken>>>,
    pub(crate) stopped: Arc<AtomicBool>,
    pub(crate) messages_tx: broadcast::Sender<HubMessage>,
}

impl ManagerCtx {
    pub(crate) fn emit(&self, method: &'static str, fields: serde_json::Value) {
        self.sink.emit(EventRecord::new(method, fields));
    }

    /// Stores a new handle, dropping (and thereby closing) any previous
    /// one first. At most one handle is live at a time.
    pub(crate) fn replace_handle(&self, conn: Option<Arc<dyn ClientConnection>>) {
        if let Ok(mut guard) = self.handle.write() {
            let old = guard.take();
            drop(old);
            *guard = conn;
        }
    }
}

/// Registers the eight lifecycle observers and the two message observers
/// on a connection. Called once per connection object.
pub(crate) fn wire_observers(ctx: &ManagerCtx, conn: &Arc<dyn ClientConnection>) {
    conn.on_starting({
        let ctx = ctx.clone();
        Box::new(move || ctx.emit("starting", json!({})))
    });
    conn.on_received({
        let ctx = ctx.clone();
        Box::new(move |payload: serde_json::Value| {
            ctx.emit("received", json!({ "payload": payload }));
        })
    });
    conn.on_slow({
        let ctx = ctx.clone();
        Box::new(move || ctx.emit("connectionSlow", json!({})))
    });
    conn.on_reconnecting({
        let ctx = ctx.clone();
        Box::new(move || ctx.emit("reconnecting", json!({})))
    });
    conn.on_reconnected({
        let ctx = ctx.clone();
        Box::new(move |negotiated: Negotiated| {
            ctx.emit(
                "reconnected",
                json!({
                    "connectionId": negotiated.connection_id,
                    "transport": negotiated.transport,
                }),
            );
        })
    });
    conn.on_state_changed({
        let ctx = ctx.clone();
        Box::new(move |change: StateChange| {
            ctx.emit(
                "stateChanged",
                json!({
                    "oldState": ConnectionState::label_for_code(change.old_code),
                    "newState": ConnectionState::label_for_code(change.new_code),
                }),
            );
        })
    });
    conn.on_disconnected({
        let ctx = ctx.clone();
        Box::new(move |info: DisconnectInfo| {
            let reason = info.reason.unwrap_or_else(|| "Unknown".into());
            ctx.emit("disconnected", json!({ "reason": reason }));
            schedule_reconnect(&ctx);
        })
    });
    conn.on_error({
        let ctx = ctx.clone();
        Box::new(move |fault: TransportFault| {
            ctx.emit(
                "error",
                json!({ "error": fault.message, "sent": fault.in_flight }),
            );
        })
    });
    conn.on_chat({
        let ctx = ctx.clone();
        Box::new(move |msg: ChatMessage| {
            let payload = serde_json::to_value(&msg).unwrap_or(serde_json::Value::Null);
            ctx.emit("chat", json!({ "payload": payload }));
            let _ = ctx.messages_tx.send(HubMessage::Chat(msg));
        })
    });
    conn.on_notification({
        let ctx = ctx.clone();
        Box::new(move |msg: NotificationMessage| {
            let payload = serde_json::to_value(&msg).unwrap_or(serde_json::Value::Null);
            ctx.emit("notification", json!({ "payload": payload }));
            let _ = ctx.messages_tx.send(HubMessage::Notification(msg));
        })
    });
}

/// Cancels any pending reconnect.
pub(crate) fn cancel_any_reconnect(reconnect_cancel: &Mutex<Option<CancellationToken>>) {
    if let Ok(mut guard) = reconnect_cancel.lock()
        && let Some(token) = guard.take()
    {
        token.cancel();
    }
}

/// Spawns the reconnect loop, cancelling any loop already pending.
pub(crate) fn schedule_reconnect(ctx: &ManagerCtx) {
    if ctx.stopped.load(Ordering::Relaxed) {
        debug!("manager stopped, not scheduling reconnect");
        return;
    }
    let cancel = CancellationToken::new();
    cancel_any_reconnect(&ctx.reconnect_cancel);
    if let Ok(mut guard) = ctx.reconnect_cancel.lock() {
        *guard = Some(cancel.clone());
    }
    tokio::spawn(reconnect_loop(ctx.clone(), cancel));
}

/// Delayed-retry loop.
///
/// Returns a boxed future to break the recursive type cycle with
/// [`wire_observers`] (whose disconnected observer spawns this function).
pub(crate) fn reconnect_loop(
    ctx: ManagerCtx,
    cancel: CancellationToken,
) -> Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
    Box::pin(async move {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            if let Some(max) = ctx.policy.max_attempts
                && attempt > max
            {
                info!(attempts = max, "reconnect attempts exhausted");
                ctx.emit("reconnectExhausted", json!({ "attempts": max }));
                break;
            }

            let delay = ctx.policy.delay_for_attempt(attempt);
            ctx.emit(
                "reconnecting",
                json!({ "attempt": attempt, "delaySecs": delay.as_secs_f64() }),
            );
            info!(
                attempt,
                delay_secs = format_args!("{:.1}", delay.as_secs_f64()),
                "reconnecting"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("reconnect cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            if cancel.is_cancelled() || ctx.stopped.load(Ordering::Relaxed) {
                return;
            }

            // Discard the previous handle entirely before opening a new one.
            ctx.replace_handle(None);

            let conn = match ctx.transport.open(&ctx.config) {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(attempt, error = %e, "reconnect open failed");
                    ctx.emit("connectionFail", json!({ "error": e.to_string() }));
                    continue;
                }
            };
            wire_observers(&ctx, &conn);
            ctx.replace_handle(Some(conn.clone()));

            match conn.start(ctx.config.transport).await {
                Ok(negotiated) => {
                    info!(connection_id = %negotiated.connection_id, "reconnected");
                    ctx.emit(
                        "connectionDone",
                        json!({
                            "connectionId": negotiated.connection_id,
                            "transport": negotiated.transport,
                        }),
                    );
                    break;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "reconnect attempt failed");
                    ctx.emit("connectionFail", json!({ "error": e.to_string() }));
                }
            }

            if cancel.is_cancelled() {
                return;
            }
        }

        // Clear the stored token if it is still ours.
        if let Ok(mut guard) = ctx.reconnect_cancel.lock()
            && !cancel.is_cancelled()
        {
            *guard = None;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_delay_is_constant() {
        let policy = ReconnectPolicy::fixed(Duration::from_secs(1));
        for attempt in 1..=5 {
            assert_eq!(policy.delay_for_attempt(attempt), Duration::from_secs(1));
        }
        assert_eq!(policy.max_attempts, None);
    }

    #[test]
    fn backoff_policy_grows_and_caps() {
        let policy = ReconnectPolicy::backoff(
            Duration::from_millis(250),
            Duration::from_secs(15),
            2.0,
        );
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(4));
        // 250ms * 2^6 = 16s, capped at 15s.
        assert_eq!(policy.delay_for_attempt(7), Duration::from_secs(15));
        assert_eq!(policy.delay_for_attempt(20), Duration::from_secs(15));
    }

    #[test]
    fn with_max_attempts_sets_limit() {
        let policy = ReconnectPolicy::fixed(Duration::from_secs(1)).with_max_attempts(3);
        assert_eq!(policy.max_attempts, Some(3));
    }

    #[test]
    fn cancel_any_reconnect_clears_token() {
        let cancel = Arc::new(Mutex::new(None));
        let token = CancellationToken::new();
        *cancel.lock().unwrap() = Some(token.clone());

        cancel_any_reconnect(&cancel);

        assert!(cancel.lock().unwrap().is_none());
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_any_reconnect_without_token_is_noop() {
        let cancel: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));
        cancel_any_reconnect(&cancel);
        assert!(cancel.lock().unwrap().is_none());
    }
}
