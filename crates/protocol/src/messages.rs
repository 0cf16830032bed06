use serde::{Deserialize, Serialize};

/// Message delivered on the chat channel.
///
/// Wire field names (`data`, `hash`) match the hub's JSON payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "data")]
    pub body: String,
    pub timestamp: String,
    #[serde(rename = "hash")]
    pub integrity_hash: String,
}

/// Message delivered on the notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub severity: String,
    #[serde(rename = "data")]
    pub body: String,
    pub timestamp: String,
    #[serde(rename = "hash")]
    pub integrity_hash: String,
}

/// Payload of the attach control message sent when a connection opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequest {
    pub hub: String,
    pub connection_id: String,
}
