//! Backend capability interface
//!
//! The engine never talks to a concrete synchronization product; it is
//! handed something implementing [`Backend`] (or nothing at all, which
//! selects local mode once at construction). The interface is the
//! minimal capability set the room model needs: last-writer-wins puts,
//! an atomic read-modify-write for counters and the host seat, one-shot
//! reads, and whole-collection snapshot subscriptions.

use serde_json::Value;

use tally_core::models::{PlayerId, RoomCode};

use crate::error::Result;

/// Receives full-collection snapshots for a subscribed path.
///
/// Fired once immediately on subscribe and again after every write at
/// or below the path. Ordering across different paths is unspecified.
pub type SnapshotSink = Box<dyn Fn(Value) + Send + Sync>;

/// Handle for cancelling a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Abstract synchronization backend
pub trait Backend: Send + Sync {
    /// Unconditional last-writer-wins write
    fn put(&self, path: &str, value: Value) -> Result<()>;

    /// Atomic read-modify-write. The closure sees the current value
    /// (None if absent) and returns the replacement; the backend must
    /// apply it without interleaving other writers. Used for score
    /// deltas and host election, where a plain put would lose updates.
    fn transact(&self, path: &str, apply: &mut dyn FnMut(Option<Value>) -> Value)
        -> Result<Value>;

    /// One-shot read of the value at a path
    fn read_once(&self, path: &str) -> Result<Option<Value>>;

    /// Subscribe to snapshots at a path
    fn subscribe(&self, path: &str, sink: SnapshotSink) -> Result<SubscriptionId>;

    /// Cancel a subscription
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Room path layout shared by every backend implementation.
///
/// A room exists implicitly from the first write under its code;
/// eviction, if any, is the backend's concern.
pub mod paths {
    use super::*;

    pub fn room(code: &RoomCode) -> String {
        format!("rooms/{code}")
    }

    pub fn players(code: &RoomCode) -> String {
        format!("rooms/{code}/players")
    }

    pub fn player(code: &RoomCode, id: &PlayerId) -> String {
        format!("rooms/{code}/players/{id}")
    }

    pub fn scores(code: &RoomCode) -> String {
        format!("rooms/{code}/scores")
    }

    pub fn score(code: &RoomCode, id: &PlayerId) -> String {
        format!("rooms/{code}/scores/{id}")
    }

    pub fn history(code: &RoomCode) -> String {
        format!("rooms/{code}/history")
    }

    pub fn action(code: &RoomCode, id: &tally_core::models::ActionId) -> String {
        format!("rooms/{code}/history/{id}")
    }

    pub fn action_vetoed(code: &RoomCode, id: &tally_core::models::ActionId) -> String {
        format!("rooms/{code}/history/{id}/vetoed")
    }

    pub fn settings(code: &RoomCode) -> String {
        format!("rooms/{code}/settings")
    }

    pub fn settings_host(code: &RoomCode) -> String {
        format!("rooms/{code}/settings/host_id")
    }

    pub fn settings_flag(code: &RoomCode, flag: &str) -> String {
        format!("rooms/{code}/settings/{flag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_layout() {
        let code = RoomCode::parse("TEST").unwrap();
        assert_eq!(paths::room(&code), "rooms/TEST");
        assert_eq!(
            paths::score(&code, &PlayerId::from("p1")),
            "rooms/TEST/scores/p1"
        );
        assert_eq!(paths::settings_host(&code), "rooms/TEST/settings/host_id");
    }
}
