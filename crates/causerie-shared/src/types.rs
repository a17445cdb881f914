//! Domain model structs shared across the workspace.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a UI layer over IPC without a translation step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a conversation (a direct-message peer or a group channel).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single message.
///
/// Optimistic entries carry a client-generated placeholder id until the
/// store gateway confirms them with the server-assigned one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a message has been confirmed by the store gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Delivery {
    /// Locally originated, not yet acknowledged.  May still be replaced
    /// or rolled back.
    Pending,
    /// Persisted by the store; immutable from the client's point of view.
    Confirmed,
    /// Submission failed and the caller chose to keep the entry visible.
    Failed,
}

/// A single chat message.
///
/// Invariant: at least one of `text` (non-whitespace) and `image` is
/// present.  Construction goes through [`OutgoingPayload::validate`] on
/// the send path; history and live events are trusted to uphold it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    /// Trimmed message text, if any.
    pub text: Option<String>,
    /// Compressed image attachment as a `data:` URL, if any.
    pub image: Option<String>,
    /// Server-assigned once confirmed; client-observed for pending entries.
    pub created_at: DateTime<Utc>,
    pub delivery: Delivery,
}

impl Message {
    pub fn is_pending(&self) -> bool {
        self.delivery == Delivery::Pending
    }
}

/// What a locally originated send carries before it becomes a [`Message`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingPayload {
    pub text: Option<String>,
    /// Transport-encoded image (`data:` URL from the compression pipeline).
    pub image: Option<String>,
}

impl OutgoingPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    /// The text with surrounding whitespace removed, dropped entirely if
    /// nothing remains.
    pub fn trimmed_text(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
    }

    pub fn is_empty(&self) -> bool {
        self.trimmed_text().is_none() && self.image.is_none()
    }

    /// Reject payloads with neither text nor image before they reach the
    /// store gateway.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(())
    }
}

/// Profile data returned by the store gateway after an avatar upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileRecord {
    pub user_id: UserId,
    pub display_name: String,
    pub email: String,
    /// Profile picture as a `data:` URL.
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}
