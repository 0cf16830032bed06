//! Protocol constants: channel targets, timing, and size limits.

use std::time::Duration;

/// Named channel targets carried in [`crate::Envelope::target`].
pub mod targets {
    /// Chat channel.
    pub const CHAT: &str = "chat";
    /// Notification channel.
    pub const NOTIFICATIONS: &str = "notifications";
    /// Control target used when attaching to a named hub.
    pub const ATTACH: &str = "attach";
}

/// Interval between keepalive pings.
pub const WS_PING_PERIOD: Duration = Duration::from_secs(15);

/// Silence threshold after which the connection is reported slow.
pub const WS_SLOW_THRESHOLD: Duration = Duration::from_secs(30);

/// Silence threshold after which the connection is considered dead.
pub const WS_LIVENESS_WAIT: Duration = Duration::from_secs(45);

/// Maximum accepted message size in bytes.
pub const WS_MAX_MESSAGE_SIZE: usize = 1024 * 1024;
