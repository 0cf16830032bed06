//! Bundled WebSocket transport.
//!
//! Fills the transport-capability seam with a tokio-tungstenite client
//! speaking JSON envelopes. Alternative transports implement the same
//! traits and plug into [`crate::env::Environment`] the same way.

mod client;
pub(crate) mod pumps;

use std::sync::Arc;

pub use client::{WsConnection, WsError};

use crate::config::HubConfig;
use crate::error::HubError;
use crate::transport::{ClientConnection, Transport};

/// WebSocket implementation of the transport capability.
pub struct WebSocketTransport;

impl Transport for WebSocketTransport {
    fn open(&self, config: &HubConfig) -> Result<Arc<dyn ClientConnection>, HubError> {
        Ok(Arc::new(WsConnection::new(config)))
    }
}

/// Rewrites http/https schemes to ws/wss.
pub(crate) fn ws_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_rewrites_schemes() {
        assert_eq!(ws_url("http://x/eh"), "ws://x/eh");
        assert_eq!(ws_url("https://x/eh"), "wss://x/eh");
        assert_eq!(ws_url("ws://x/eh"), "ws://x/eh");
        assert_eq!(ws_url("wss://x/eh"), "wss://x/eh");
    }

    #[test]
    fn open_builds_unstarted_connection() {
        let config = HubConfig::new("http://x", "EventHub");
        let conn = WebSocketTransport.open(&config).unwrap();
        assert_eq!(conn.state(), hublink_protocol::ConnectionState::Disconnected);
        assert!(conn.connection_id().is_none());
        assert!(conn.transport_name().is_none());
    }
}
