//! Wire types for hublink client-hub communication.
//!
//! Shared by every transport implementation: the JSON envelope, the named
//! channel targets, typed channel payloads, and connection state codes.

pub mod constants;
pub mod envelope;
pub mod messages;
pub mod state;

pub use envelope::Envelope;
pub use messages::{AttachRequest, ChatMessage, NotificationMessage};
pub use state::ConnectionState;
