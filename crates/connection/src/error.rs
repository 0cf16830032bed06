//! Error taxonomy for the connection manager.

/// Errors surfaced by the connection manager and transport capability.
///
/// Only construction-time failures are returned to callers; everything
/// after `init` is emitted through the event sink instead.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The environment exposes no transport capability. Fatal at `init`.
    #[error("hub transport capability not available")]
    Environment,

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Connection negotiation failed. Recoverable; only the disconnected
    /// path schedules retries.
    #[error("connection negotiation failed: {reason}")]
    ConnectionFailure { reason: String },

    /// Runtime error surfaced by an active connection.
    #[error("transport error: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            HubError::Environment.to_string(),
            "hub transport capability not available"
        );
        assert_eq!(
            HubError::Config("bad mode".into()).to_string(),
            "invalid configuration: bad mode"
        );
        assert_eq!(
            HubError::ConnectionFailure {
                reason: "refused".into()
            }
            .to_string(),
            "connection negotiation failed: refused"
        );
        assert_eq!(
            HubError::Transport("reset".into()).to_string(),
            "transport error: reset"
        );
    }
}
