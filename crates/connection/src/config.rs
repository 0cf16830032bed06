//! Connection configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::error::HubError;

/// Transport negotiation preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportPreference {
    #[default]
    Auto,
    WebSockets,
    ServerSentEvents,
    LongPolling,
}

impl TransportPreference {
    /// Configuration string for this preference.
    pub const fn as_str(self) -> &'static str {
        match self {
            TransportPreference::Auto => "auto",
            TransportPreference::WebSockets => "webSockets",
            TransportPreference::ServerSentEvents => "serverSentEvents",
            TransportPreference::LongPolling => "longPolling",
        }
    }
}

impl FromStr for TransportPreference {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(TransportPreference::Auto),
            "webSockets" => Ok(TransportPreference::WebSockets),
            "serverSentEvents" => Ok(TransportPreference::ServerSentEvents),
            "longPolling" => Ok(TransportPreference::LongPolling),
            other => Err(HubError::Config(format!("unknown transport mode: {other}"))),
        }
    }
}

/// Path appended to the endpoint URL when `use_default_path` is set.
pub(crate) const DEFAULT_HUB_PATH: &str = "/hub";

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connection configuration. Set once at construction, never mutated.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Base URL of the remote hub host.
    pub endpoint_url: String,
    /// Name of the hub to attach to.
    pub hub_name: String,
    /// Transport negotiation preference.
    pub transport: TransportPreference,
    /// When false and no sink is injected, events are dropped instead of
    /// logged.
    pub logging_enabled: bool,
    /// When true, `/hub` is appended to the endpoint URL.
    pub use_default_path: bool,
    /// Delay seeding the default reconnect policy.
    pub reconnect_delay: Duration,
}

impl HubConfig {
    /// Creates a configuration with default transport, logging, path, and
    /// reconnect settings.
    pub fn new(endpoint_url: impl Into<String>, hub_name: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            hub_name: hub_name.into(),
            transport: TransportPreference::Auto,
            logging_enabled: true,
            use_default_path: true,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// URL the connection is opened against.
    pub fn connection_url(&self) -> String {
        if self.use_default_path {
            format!(
                "{}{}",
                self.endpoint_url.trim_end_matches('/'),
                DEFAULT_HUB_PATH
            )
        } else {
            self.endpoint_url.clone()
        }
    }
}
