//! Score ledger and veto targeting
//!
//! Scores are plain signed counters per player. In connected mode the
//! ledger is mutated only through the backend's atomic read-modify-write
//! primitive seeded by [`bump`]; a plain overwrite would lose concurrent
//! taps from other devices, which is the one correctness risk this
//! module exists to prevent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{ActionId, ActionRecord, PlayerId};

/// A single scoring delta. Scoring is always one point at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreDelta {
    /// A tap: +1
    Award,
    /// A veto compensation: -1
    Revoke,
}

impl ScoreDelta {
    pub fn value(&self) -> i64 {
        match self {
            ScoreDelta::Award => 1,
            ScoreDelta::Revoke => -1,
        }
    }
}

/// Transaction seed for the backend's atomic increment.
///
/// An absent counter reads as zero. Must be applied inside
/// `Backend::transact`, never via read-then-write.
pub fn bump(current: Option<i64>, delta: i64) -> i64 {
    current.unwrap_or(0) + delta
}

/// Transaction seed that creates a zero entry if absent and otherwise
/// leaves the counter alone. Used when a player first joins.
pub fn seed_zero(current: Option<i64>) -> i64 {
    current.unwrap_or(0)
}

/// Player -> score mapping. Absent entries are implicitly zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreLedger(BTreeMap<PlayerId, i64>);

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, player_id: &PlayerId) -> i64 {
        self.0.get(player_id).copied().unwrap_or(0)
    }

    /// Apply a signed unit delta in-process (local mode)
    pub fn apply(&mut self, player_id: &PlayerId, delta: ScoreDelta) -> i64 {
        let entry = self.0.entry(player_id.clone()).or_insert(0);
        *entry += delta.value();
        *entry
    }

    /// Ensure an entry exists without changing its value
    pub fn ensure(&mut self, player_id: &PlayerId) {
        self.0.entry(player_id.clone()).or_insert(0);
    }

    pub fn remove(&mut self, player_id: &PlayerId) {
        self.0.remove(player_id);
    }

    /// Zero every listed player's score
    pub fn reset<'a>(&mut self, players: impl Iterator<Item = &'a PlayerId>) {
        for id in players {
            self.0.insert(id.clone(), 0);
        }
    }

    /// Replace the whole ledger with a remote snapshot
    pub fn replace_all(&mut self, scores: BTreeMap<PlayerId, i64>) {
        self.0 = scores;
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, i64)> {
        self.0.iter().map(|(id, score)| (id, *score))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The chronologically latest unvetoed record across the whole room.
///
/// History arrives as an unordered map, so the search sorts by
/// `(time, id)`; the id tie-break keeps the choice deterministic when
/// two devices tapped in the same millisecond.
pub fn latest_unvetoed(history: &BTreeMap<ActionId, ActionRecord>) -> Option<&ActionRecord> {
    history
        .values()
        .filter(|record| !record.vetoed)
        .max_by(|a, b| (a.time, &a.id).cmp(&(b.time, &b.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKey;

    fn record(id: &str, player: &str, time: i64, vetoed: bool) -> ActionRecord {
        ActionRecord {
            id: ActionId::from(id),
            player_id: PlayerId::from(player),
            event_key: EventKey::new("list", 0),
            label: "event".to_string(),
            time,
            vetoed,
        }
    }

    #[test]
    fn test_absent_score_is_zero() {
        let ledger = ScoreLedger::new();
        assert_eq!(ledger.get(&PlayerId::from("p1")), 0);
    }

    #[test]
    fn test_apply_deltas() {
        let mut ledger = ScoreLedger::new();
        let p1 = PlayerId::from("p1");
        assert_eq!(ledger.apply(&p1, ScoreDelta::Award), 1);
        assert_eq!(ledger.apply(&p1, ScoreDelta::Award), 2);
        assert_eq!(ledger.apply(&p1, ScoreDelta::Revoke), 1);
    }

    #[test]
    fn test_score_may_go_negative_after_veto() {
        let mut ledger = ScoreLedger::new();
        let p1 = PlayerId::from("p1");
        assert_eq!(ledger.apply(&p1, ScoreDelta::Revoke), -1);
    }

    #[test]
    fn test_bump_seeds_zero_when_absent() {
        assert_eq!(bump(None, 1), 1);
        assert_eq!(bump(Some(4), 1), 5);
        assert_eq!(bump(Some(0), -1), -1);
        assert_eq!(seed_zero(None), 0);
        assert_eq!(seed_zero(Some(7)), 7);
    }

    #[test]
    fn test_latest_unvetoed_ignores_insertion_order() {
        let mut history = BTreeMap::new();
        // Inserted newest-first; the map orders by id, not time
        history.insert(ActionId::from("a1"), record("a1", "p1", 3000, false));
        history.insert(ActionId::from("a2"), record("a2", "p2", 1000, false));
        history.insert(ActionId::from("a3"), record("a3", "p1", 2000, false));

        let latest = latest_unvetoed(&history).unwrap();
        assert_eq!(latest.id.as_str(), "a1");
    }

    #[test]
    fn test_latest_unvetoed_skips_vetoed() {
        let mut history = BTreeMap::new();
        history.insert(ActionId::from("a1"), record("a1", "p1", 1000, false));
        history.insert(ActionId::from("a2"), record("a2", "p2", 2000, true));

        let latest = latest_unvetoed(&history).unwrap();
        assert_eq!(latest.id.as_str(), "a1");
    }

    #[test]
    fn test_latest_unvetoed_empty() {
        let history = BTreeMap::new();
        assert!(latest_unvetoed(&history).is_none());
    }

    #[test]
    fn test_latest_unvetoed_same_millisecond_tie_break() {
        let mut history = BTreeMap::new();
        history.insert(ActionId::from("a1"), record("a1", "p1", 1000, false));
        history.insert(ActionId::from("a2"), record("a2", "p2", 1000, false));

        // Deterministic: highest id wins the tie
        let latest = latest_unvetoed(&history).unwrap();
        assert_eq!(latest.id.as_str(), "a2");
    }
}
