//! # causerie-client
//!
//! The conversation synchronization engine: one authoritative, ordered
//! message list per active conversation, merging three origins — the
//! historical load, locally originated optimistic sends, and live inbound
//! events — without duplication.
//!
//! The store gateway and the live transport are external collaborators:
//! the first sits behind the [`MessageGateway`] trait, the second pushes
//! events into a [`LiveFeed`].  Observers (typically a UI layer) receive
//! [`EngineUpdate`]s over a broadcast channel instead of relying on any
//! rendering framework's re-render semantics.

pub mod composer;
pub mod engine;
pub mod gateway;
pub mod live;
pub mod updates;

mod error;

pub use composer::Composer;
pub use engine::{ChatSnapshot, SyncEngine, SyncPhase};
pub use error::{Result, SyncError};
pub use gateway::{GatewayError, MessageGateway};
pub use live::{LiveEvent, LiveFeed};
pub use updates::EngineUpdate;
