//! Explicit capability environment.
//!
//! Replaces ambient capability lookup: the transport and sink are
//! attached here and handed to [`crate::ConnectionManager::init`], so
//! tests can substitute doubles for either.

use std::sync::Arc;

use crate::sink::{EventSink, NullSink, TracingSink};
use crate::transport::Transport;
use crate::ws::WebSocketTransport;

/// Capabilities available to a connection manager.
#[derive(Clone, Default)]
pub struct Environment {
    transport: Option<Arc<dyn Transport>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl Environment {
    /// An environment with no capabilities attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment carrying the bundled WebSocket transport.
    pub fn detect() -> Self {
        Self::new().with_transport(Arc::new(WebSocketTransport))
    }

    /// Attaches a transport capability.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attaches an event sink. An explicitly attached sink is always
    /// used, regardless of the logging flag.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub(crate) fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport.clone()
    }

    /// The sink to use: the attached one if any, otherwise the tracing
    /// sink, silenced when logging is disabled.
    pub(crate) fn sink_for(&self, logging_enabled: bool) -> Arc<dyn EventSink> {
        match &self.sink {
            Some(sink) => sink.clone(),
            None if logging_enabled => Arc::new(TracingSink),
            None => Arc::new(NullSink),
        }
    }
}
