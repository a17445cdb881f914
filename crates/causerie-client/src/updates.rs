//! Observer notifications.
//!
//! The original surface relied on UI re-renders to react to store
//! mutations; here observers register for explicit change events over a
//! broadcast channel, decoupled from any rendering technology.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::engine::SyncPhase;

/// State-change notifications emitted by the engine.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EngineUpdate {
    /// The visible message list changed (append, replace, reconcile).
    MessagesChanged,

    /// The selection state machine moved.
    PhaseChanged(SyncPhase),

    /// The live channel lagged or closed.  History viewing and sending
    /// keep working; the UI may want to show a degraded-connection hint.
    LiveChannelDown,
}

pub(crate) fn emit(tx: &broadcast::Sender<EngineUpdate>, update: EngineUpdate) {
    // No receivers just means nobody is watching yet.
    if tx.send(update).is_err() {
        tracing::trace!("Engine update emitted with no listeners");
    }
}
