//! The conversation synchronization engine.
//!
//! [`SyncEngine`] owns the in-memory message list for the currently
//! active conversation and is the only component allowed to mutate it:
//! wholesale replacement on history load, ordered append with dedup on
//! live events, optimistic append plus reconciliation on send.  All
//! mutation happens behind one mutex, and the guard is never held across
//! an await point.
//!
//! State machine per selection:
//! `Unselected → HistoryLoading → Subscribed ⇄ Sending`, back to
//! `Unselected` on deselection.  A failing history load returns to
//! `Unselected` with the error surfaced; the previous list is preserved.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use causerie_shared::constants::UPDATE_FEED_CAPACITY;
use causerie_shared::{
    ConversationId, Delivery, Message, MessageId, OutgoingPayload, ProfileRecord, UserId,
};

use crate::error::{Result, SyncError};
use crate::gateway::MessageGateway;
use crate::live::{LiveEvent, LiveFeed};
use crate::updates::{emit, EngineUpdate};

/// Where the engine stands for the current conversation selection.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    Unselected,
    HistoryLoading,
    Subscribed,
    Sending,
}

/// Immutable view of the engine state for UI consumption.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub conversation: Option<ConversationId>,
    pub phase: SyncPhase,
    pub messages: Vec<Message>,
}

struct Subscription {
    conversation: ConversationId,
    task: JoinHandle<()>,
}

struct EngineState {
    active: Option<ConversationId>,
    phase: SyncPhase,
    messages: Vec<Message>,
    /// Bumped on every history load; a fetch resolving under a stale
    /// generation is discarded instead of overwriting the active list.
    generation: u64,
    send_in_flight: bool,
    upload_in_flight: bool,
    subscription: Option<Subscription>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            active: None,
            phase: SyncPhase::Unselected,
            messages: Vec::new(),
            generation: 0,
            send_in_flight: false,
            upload_in_flight: false,
            subscription: None,
        }
    }
}

/// The synchronization engine, generic over the store gateway.
///
/// Cloning is cheap and every clone operates on the same state, so the
/// engine can be handed to spawned tasks and UI callbacks alike.
pub struct SyncEngine<G: MessageGateway> {
    gateway: Arc<G>,
    live: LiveFeed,
    local_user: UserId,
    state: Arc<Mutex<EngineState>>,
    updates_tx: broadcast::Sender<EngineUpdate>,
}

impl<G: MessageGateway> Clone for SyncEngine<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            live: self.live.clone(),
            local_user: self.local_user,
            state: Arc::clone(&self.state),
            updates_tx: self.updates_tx.clone(),
        }
    }
}

impl<G: MessageGateway> SyncEngine<G> {
    pub fn new(gateway: G, live: LiveFeed, local_user: UserId) -> Self {
        let (updates_tx, _) = broadcast::channel(UPDATE_FEED_CAPACITY);
        Self {
            gateway: Arc::new(gateway),
            live,
            local_user,
            state: Arc::new(Mutex::new(EngineState::new())),
            updates_tx,
        }
    }

    /// Register an observer for state-change notifications.
    pub fn updates(&self) -> broadcast::Receiver<EngineUpdate> {
        self.updates_tx.subscribe()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let st = self.lock_state();
        ChatSnapshot {
            conversation: st.active,
            phase: st.phase,
            messages: st.messages.clone(),
        }
    }

    /// Select a conversation: replace the live subscription, then load
    /// history.  The subscription swap happens first so no event window
    /// exists where the old conversation still receives appends.
    pub async fn select_conversation(&self, conversation: ConversationId) -> Result<Vec<Message>> {
        self.subscribe(conversation);
        self.load_history(conversation).await
    }

    /// Fetch persisted history and replace the visible list wholesale.
    ///
    /// Safe to call repeatedly — the list always equals the last
    /// successful fetch, never an accumulation.  A fetch that resolves
    /// after a newer selection is discarded with
    /// [`SyncError::Superseded`].
    pub async fn load_history(&self, conversation: ConversationId) -> Result<Vec<Message>> {
        let generation = {
            let mut st = self.lock_state();
            st.active = Some(conversation);
            st.generation += 1;
            st.phase = SyncPhase::HistoryLoading;
            emit(&self.updates_tx, EngineUpdate::PhaseChanged(st.phase));
            st.generation
        };

        match self.gateway.fetch_history(conversation).await {
            Ok(mut history) => {
                let mut st = self.lock_state();
                if st.generation != generation {
                    debug!(%conversation, "Discarding history fetch for a superseded selection");
                    return Err(SyncError::Superseded);
                }
                // Stable sort: ties keep the store's arrival order.
                history.sort_by_key(|m| m.created_at);
                st.messages = history.clone();
                st.phase = resting_phase(&st);
                emit(&self.updates_tx, EngineUpdate::MessagesChanged);
                emit(&self.updates_tx, EngineUpdate::PhaseChanged(st.phase));
                info!(%conversation, count = history.len(), "History loaded");
                Ok(history)
            }
            Err(e) => {
                let mut st = self.lock_state();
                if st.generation == generation {
                    // Prior list is preserved for degraded viewing.
                    st.phase = SyncPhase::Unselected;
                    emit(&self.updates_tx, EngineUpdate::PhaseChanged(st.phase));
                }
                warn!(%conversation, error = %e, "History load failed");
                Err(SyncError::Fetch(e))
            }
        }
    }

    /// Start receiving live events for `conversation`, tearing down any
    /// previous subscription first.  At most one subscription exists at
    /// any time.
    pub fn subscribe(&self, conversation: ConversationId) {
        let mut st = self.lock_state();
        if let Some(old) = st.subscription.take() {
            debug!(old = %old.conversation, new = %conversation, "Replacing live subscription");
            old.task.abort();
        }
        st.active = Some(conversation);

        let rx = self.live.listen();
        let task = tokio::spawn(live_loop(
            conversation,
            self.local_user,
            rx,
            Arc::clone(&self.state),
            self.updates_tx.clone(),
        ));
        st.subscription = Some(Subscription { conversation, task });

        if st.phase == SyncPhase::Unselected {
            st.phase = SyncPhase::Subscribed;
            emit(&self.updates_tx, EngineUpdate::PhaseChanged(st.phase));
        }
        info!(%conversation, "Subscribed to live events");
    }

    /// Tear down the live subscription and deselect.  Calling this with
    /// no active subscription is a no-op, not an error.
    pub fn unsubscribe(&self) {
        let mut st = self.lock_state();
        match st.subscription.take() {
            Some(sub) => {
                sub.task.abort();
                st.active = None;
                st.phase = SyncPhase::Unselected;
                emit(&self.updates_tx, EngineUpdate::PhaseChanged(st.phase));
                info!(conversation = %sub.conversation, "Unsubscribed from live events");
            }
            None => debug!("Unsubscribe with no active subscription, nothing to do"),
        }
    }

    /// Send a message to the active conversation.
    ///
    /// An optimistic entry with a client timestamp appears immediately;
    /// on success it is replaced (never duplicate-appended) by the
    /// confirmed record, which may reorder it to the server timestamp.
    ///
    /// On failure the optimistic entry is deliberately left in place —
    /// different UIs want different failure presentations, so the caller
    /// must follow up with [`discard_pending`](Self::discard_pending) or
    /// [`mark_failed`](Self::mark_failed) using the id carried in
    /// [`SyncError::Send`].
    pub async fn send_message(&self, payload: OutgoingPayload) -> Result<Message> {
        payload.validate()?;
        let normalized = OutgoingPayload {
            text: payload.trimmed_text(),
            image: payload.image.clone(),
        };

        let (conversation, placeholder) = {
            let mut st = self.lock_state();
            let conversation = st.active.ok_or(SyncError::NoConversation)?;
            if st.send_in_flight {
                return Err(SyncError::SendInFlight);
            }
            st.send_in_flight = true;
            st.phase = SyncPhase::Sending;

            let optimistic = Message {
                id: MessageId::new(),
                conversation_id: conversation,
                sender_id: self.local_user,
                text: normalized.text.clone(),
                image: normalized.image.clone(),
                // Provisional; superseded by the server timestamp on
                // reconciliation.
                created_at: Utc::now(),
                delivery: Delivery::Pending,
            };
            let placeholder = optimistic.id;
            st.messages.push(optimistic);
            emit(&self.updates_tx, EngineUpdate::MessagesChanged);
            emit(&self.updates_tx, EngineUpdate::PhaseChanged(st.phase));
            (conversation, placeholder)
        };

        let result = self.gateway.send_message(conversation, normalized).await;

        let mut st = self.lock_state();
        st.send_in_flight = false;
        st.phase = resting_phase(&st);
        emit(&self.updates_tx, EngineUpdate::PhaseChanged(st.phase));

        match result {
            Ok(mut confirmed) => {
                confirmed.delivery = Delivery::Confirmed;
                // Drop the placeholder and any copy a racing live event
                // may have appended under the confirmed id.
                st.messages
                    .retain(|m| m.id != placeholder && m.id != confirmed.id);
                insert_ordered(&mut st.messages, confirmed.clone());
                emit(&self.updates_tx, EngineUpdate::MessagesChanged);
                info!(msg_id = %confirmed.id, %conversation, "Message sent");
                Ok(confirmed)
            }
            Err(e) => {
                warn!(%conversation, error = %e, "Message send failed");
                Err(SyncError::Send {
                    error: e,
                    pending: placeholder,
                })
            }
        }
    }

    /// Roll back an optimistic entry after a failed send.  Returns
    /// whether an entry was actually removed.
    pub fn discard_pending(&self, id: MessageId) -> bool {
        let mut st = self.lock_state();
        let before = st.messages.len();
        st.messages
            .retain(|m| !(m.id == id && m.delivery == Delivery::Pending));
        let removed = st.messages.len() != before;
        if removed {
            emit(&self.updates_tx, EngineUpdate::MessagesChanged);
        }
        removed
    }

    /// Keep a failed optimistic entry visible but flag it.  Returns
    /// whether a pending entry with this id existed.
    pub fn mark_failed(&self, id: MessageId) -> bool {
        let mut st = self.lock_state();
        let entry = st
            .messages
            .iter_mut()
            .find(|m| m.id == id && m.delivery == Delivery::Pending);
        match entry {
            Some(m) => {
                m.delivery = Delivery::Failed;
                emit(&self.updates_tx, EngineUpdate::MessagesChanged);
                true
            }
            None => false,
        }
    }

    /// Upload an already prepared profile picture through the gateway.
    pub async fn upload_profile_image(&self, image_data_url: String) -> Result<ProfileRecord> {
        {
            let mut st = self.lock_state();
            if st.upload_in_flight {
                return Err(SyncError::UploadInFlight);
            }
            st.upload_in_flight = true;
        }

        let result = self.gateway.upload_profile_image(image_data_url).await;
        self.lock_state().upload_in_flight = false;

        match result {
            Ok(profile) => {
                info!(user = %profile.user_id, "Profile image updated");
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "Profile image upload failed");
                Err(SyncError::Upload(e))
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn resting_phase(st: &EngineState) -> SyncPhase {
    if st.active.is_none() {
        SyncPhase::Unselected
    } else if st.send_in_flight {
        SyncPhase::Sending
    } else {
        SyncPhase::Subscribed
    }
}

/// Insert keeping `created_at` ascending; equal timestamps keep arrival
/// order.
fn insert_ordered(messages: &mut Vec<Message>, msg: Message) {
    let pos = messages.partition_point(|m| m.created_at <= msg.created_at);
    messages.insert(pos, msg);
}

/// Per-subscription forwarding task: filter the live feed down to one
/// conversation and apply matching events to the shared list.
async fn live_loop(
    conversation: ConversationId,
    local_user: UserId,
    mut rx: broadcast::Receiver<LiveEvent>,
    state: Arc<Mutex<EngineState>>,
    updates_tx: broadcast::Sender<EngineUpdate>,
) {
    debug!(%conversation, "Live subscription task started");
    loop {
        match rx.recv().await {
            Ok(LiveEvent::NewMessage(msg)) => {
                if msg.conversation_id != conversation {
                    continue;
                }
                // Own sends arrive through reconciliation, not the feed.
                if msg.sender_id == local_user {
                    continue;
                }
                apply_inbound(&state, &updates_tx, msg);
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(%conversation, missed, "Live feed lagged, events were dropped");
                emit(&updates_tx, EngineUpdate::LiveChannelDown);
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!(%conversation, "Live feed closed");
                emit(&updates_tx, EngineUpdate::LiveChannelDown);
                break;
            }
        }
    }
}

fn apply_inbound(
    state: &Mutex<EngineState>,
    updates_tx: &broadcast::Sender<EngineUpdate>,
    mut msg: Message,
) {
    let mut st = state.lock().unwrap_or_else(|e| e.into_inner());
    if st.active != Some(msg.conversation_id) {
        return;
    }
    // The transport is at-least-once with no dedup guarantee; drop
    // anything whose identifier is already in the list, including
    // already-reconciled optimistic entries.
    if st.messages.iter().any(|m| m.id == msg.id) {
        debug!(msg_id = %msg.id, "Duplicate live event ignored");
        return;
    }
    msg.delivery = Delivery::Confirmed;
    insert_ordered(&mut st.messages, msg);
    emit(updates_tx, EngineUpdate::MessagesChanged);
}
