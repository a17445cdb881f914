//! The live channel boundary.
//!
//! An external transport pushes inbound events into a [`LiveFeed`]; the
//! engine subscribes with a filtered forwarding task per active
//! conversation.  Delivery is assumed at-least-once with no ordering or
//! deduplication guarantee, so consumers must be defensive.

use tokio::sync::broadcast;

use causerie_shared::constants::LIVE_FEED_CAPACITY;
use causerie_shared::Message;

/// Events delivered by the live transport.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// A new message addressed to some conversation this client is in.
    NewMessage(Message),
}

/// Fan-out handle for live transport events.
///
/// Cloning is cheap; every clone publishes into the same feed.
#[derive(Clone)]
pub struct LiveFeed {
    tx: broadcast::Sender<LiveEvent>,
}

impl LiveFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(LIVE_FEED_CAPACITY);
        Self { tx }
    }

    /// Publish an inbound event.  Having no listeners is normal (no
    /// conversation selected) and not an error.
    pub fn publish(&self, event: LiveEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Live event published with no active subscription");
        }
    }

    pub(crate) fn listen(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::new()
    }
}
