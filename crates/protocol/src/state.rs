//! Connection state codes and labels.

/// Label reported for a state code this crate does not recognize.
pub const UNKNOWN_STATE_LABEL: &str = "N/A";

/// State of a hub connection, owned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Negotiation in progress.
    Connecting,
    /// Connected and attached to the hub.
    Connected,
    /// Transport is transparently re-establishing the connection.
    Reconnecting,
    /// Connection lost or never established.
    Disconnected,
}

impl ConnectionState {
    /// Stable wire code for this state.
    pub const fn code(self) -> i32 {
        match self {
            ConnectionState::Connecting => 0,
            ConnectionState::Connected => 1,
            ConnectionState::Reconnecting => 2,
            ConnectionState::Disconnected => 3,
        }
    }

    /// Parses a wire code, returning `None` for unrecognized codes.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ConnectionState::Connecting),
            1 => Some(ConnectionState::Connected),
            2 => Some(ConnectionState::Reconnecting),
            3 => Some(ConnectionState::Disconnected),
            _ => None,
        }
    }

    /// Human-readable state name.
    pub const fn label(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Reconnecting => "Reconnecting",
            ConnectionState::Disconnected => "Disconnected",
        }
    }

    /// Label for a wire code, `"N/A"` if the code is not recognized.
    pub fn label_for_code(code: i32) -> &'static str {
        Self::from_code(code).map_or(UNKNOWN_STATE_LABEL, Self::label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        for state in [
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::Disconnected,
        ] {
            assert_eq!(ConnectionState::from_code(state.code()), Some(state));
        }
    }

    #[test]
    fn unknown_code_has_no_state() {
        assert_eq!(ConnectionState::from_code(-1), None);
        assert_eq!(ConnectionState::from_code(4), None);
        assert_eq!(ConnectionState::from_code(99), None);
    }

    #[test]
    fn labels() {
        assert_eq!(ConnectionState::Connected.label(), "Connected");
        assert_eq!(ConnectionState::label_for_code(0), "Connecting");
        assert_eq!(ConnectionState::label_for_code(3), "Disconnected");
        assert_eq!(ConnectionState::label_for_code(42), UNKNOWN_STATE_LABEL);
        assert_eq!(ConnectionState::label_for_code(-7), UNKNOWN_STATE_LABEL);
    }
}
