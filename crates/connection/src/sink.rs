//! Injectable structured event sink.

use serde::Serialize;
use tracing::info;

/// Structured record emitted for every observed connection event.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub method: &'static str,
    pub fields: serde_json::Value,
}

impl EventRecord {
    pub fn new(method: &'static str, fields: serde_json::Value) -> Self {
        Self { method, fields }
    }
}

/// Sink for connection event records.
///
/// The manager emits every lifecycle and message event through this
/// trait, so downstream consumers (a message bus, a test recorder) can be
/// attached without touching the manager itself.
pub trait EventSink: Send + Sync {
    fn emit(&self, record: EventRecord);
}

/// Default sink: structured logs via `tracing`.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, record: EventRecord) {
        info!(
            target: "hublink",
            method = record.method,
            fields = %record.fields,
            "hub event"
        );
    }
}

/// Sink that drops every record. Used when logging is disabled and no
/// sink is injected.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _record: EventRecord) {}
}
