//! Client connection manager for named real-time hubs.
//!
//! Opens a persistent connection to a remote hub, wires lifecycle and
//! message observers to an injectable event sink, fans application
//! messages out to internal subscribers, and recovers from disconnection
//! with a configurable, cancellable reconnect policy.
//!
//! ```no_run
//! use hublink_connection::{ConnectionManager, Environment, HubConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), hublink_connection::HubError> {
//! let config = HubConfig::new("http://x/eh", "EventHub");
//! let manager = ConnectionManager::init(config, &Environment::detect())?;
//! manager.start_connection();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod manager;
pub mod reconnect;
pub mod sink;
pub mod transport;
pub mod ws;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{HubConfig, TransportPreference};
pub use env::Environment;
pub use error::HubError;
pub use manager::{ConnectionManager, HubMessage, NO_CONNECTION_ID, NO_TRANSPORT};
pub use reconnect::ReconnectPolicy;
pub use sink::{EventRecord, EventSink, NullSink, TracingSink};
pub use transport::{
    Callback, ClientConnection, DisconnectInfo, Negotiated, StateChange, Transport,
    TransportFault, VoidCallback,
};
pub use ws::{WebSocketTransport, WsConnection, WsError};
