use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single addressed message in a workspace mailbox.
///
/// Messages are append-only: once in the mailbox they are never mutated or
/// removed. Delivery to the recipient happens through per-teammate cursor
/// advancement (see `Workspace::drain_unread`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailMessage {
    /// The sending teammate.
    pub from_id: Uuid,
    /// The addressed teammate.
    pub to_id: Uuid,
    /// Message body.
    pub content: String,
    /// UTC timestamp of when the message was appended.
    pub sent_at: DateTime<Utc>,
}

impl MailMessage {
    /// Creates a message stamped with the current time.
    pub fn new(from_id: Uuid, to_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            from_id,
            to_id,
            content: content.into(),
            sent_at: Utc::now(),
        }
    }
}
