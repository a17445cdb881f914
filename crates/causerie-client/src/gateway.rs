//! The store gateway boundary.
//!
//! Persistence is an external collaborator: whatever actually stores
//! messages (an HTTP backend, a local database, a test double) implements
//! [`MessageGateway`] and the engine never looks behind it.

use std::future::Future;

use thiserror::Error;

use causerie_shared::{ConversationId, Message, OutgoingPayload, ProfileRecord};

/// Failures reported by the store gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The store could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The store answered but refused the request.
    #[error("Store rejected the request: {0}")]
    Rejected(String),
}

/// The engine's view of the message store.
///
/// Methods return `impl Future + Send` rather than plain `async fn` so the
/// engine's own futures stay `Send`; implementations can still use
/// `async fn` directly.
pub trait MessageGateway: Send + Sync + 'static {
    /// Fetch the persisted history of a conversation, oldest first.
    fn fetch_history(
        &self,
        conversation: ConversationId,
    ) -> impl Future<Output = Result<Vec<Message>, GatewayError>> + Send;

    /// Persist and deliver a message, returning the confirmed record with
    /// its server-assigned identifier and timestamp.
    fn send_message(
        &self,
        conversation: ConversationId,
        payload: OutgoingPayload,
    ) -> impl Future<Output = Result<Message, GatewayError>> + Send;

    /// Replace the session user's profile picture with an already
    /// compressed and encoded `data:` URL.
    fn upload_profile_image(
        &self,
        image_data_url: String,
    ) -> impl Future<Output = Result<ProfileRecord, GatewayError>> + Send;
}
