//! Room state synchronization for tally sessions
//!
//! A [`RoomSync`] engine mirrors one room across devices through a
//! pluggable [`Backend`], or runs standalone as a local hotseat when no
//! backend is available. Remote snapshots are folded in on demand via
//! [`RoomSync::pump`], keeping the engine single threaded and
//! re-entrancy free.

pub mod backend;
pub mod engine;
pub mod error;
pub mod memory;
pub mod outcome;
pub mod patch;

pub use backend::{Backend, SnapshotSink, SubscriptionId};
pub use engine::{now_ms, RoomSync};
pub use error::{Error, Result};
pub use memory::MemoryBackend;
pub use outcome::{ActionOutcome, RoomEvent, SyncMode};
pub use patch::{RoomPatch, RoomSection};
