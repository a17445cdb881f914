use thiserror::Error;

use causerie_media::MediaError;
use causerie_shared::{MessageId, ValidationError};

use crate::gateway::GatewayError;

/// Errors surfaced by the synchronization engine.
///
/// Every variant leaves the engine in the prior valid state or an
/// explicitly degraded-but-usable one; none of them crash anything.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Empty payload rejected before it reaches the store gateway.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No conversation is selected.
    #[error("No active conversation")]
    NoConversation,

    /// A send is already outstanding; repeated UI triggers are rejected
    /// before the transport.
    #[error("A send is already in flight")]
    SendInFlight,

    /// A profile-image upload is already outstanding.
    #[error("A profile upload is already in flight")]
    UploadInFlight,

    /// History load failed.  The previously visible list is preserved;
    /// the user may retry by reselecting the conversation.
    #[error("History load failed: {0}")]
    Fetch(GatewayError),

    /// Message submission failed.  The optimistic entry (identified by
    /// `pending`) is left in place; the caller must roll it back via
    /// [`SyncEngine::discard_pending`](crate::SyncEngine::discard_pending)
    /// or [`SyncEngine::mark_failed`](crate::SyncEngine::mark_failed).
    #[error("Message send failed: {error}")]
    Send {
        error: GatewayError,
        pending: MessageId,
    },

    /// Profile-image upload failed.
    #[error("Profile upload failed: {0}")]
    Upload(GatewayError),

    /// The operation resolved after the active conversation changed; its
    /// result was discarded rather than applied to the wrong list.
    #[error("Result superseded by a newer conversation selection")]
    Superseded,

    /// Attachment preparation failed in the media pipeline.
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;
