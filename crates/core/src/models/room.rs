//! Room aggregate - the synchronization unit

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{ActionId, ActionRecord, Player, PlayerId, RoomCode};
use crate::scoring::ScoreLedger;

/// Display name shown for a history entry whose player snapshot has not
/// arrived yet. Never treated as corruption; a later players snapshot
/// resolves it.
pub const UNKNOWN_PLAYER_NAME: &str = "Unknown";
pub const UNKNOWN_PLAYER_GLYPH: &str = "❓";

/// Room-level flags and host assignment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSettings {
    #[serde(default)]
    pub team_mode_enabled: bool,
    #[serde(default)]
    pub roster_locked: bool,
    #[serde(default)]
    pub game_paused: bool,
    #[serde(default)]
    pub host_id: Option<PlayerId>,
}

/// The shared session state.
///
/// In connected mode every sub-map is a read-through cache of the
/// backend's copy; in local mode this is the single authoritative copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub code: RoomCode,
    pub players: BTreeMap<PlayerId, Player>,
    pub scores: ScoreLedger,
    /// Keyed by action id; chronological order comes from sorting by
    /// `(time, id)`, never from map order
    pub history: BTreeMap<ActionId, ActionRecord>,
    pub settings: RoomSettings,
}

/// One rendered feed line with the player reference resolved
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub action_id: ActionId,
    pub player_name: String,
    pub player_glyph: String,
    pub label: String,
    pub time: i64,
    pub vetoed: bool,
}

impl Room {
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            players: BTreeMap::new(),
            scores: ScoreLedger::new(),
            history: BTreeMap::new(),
            settings: RoomSettings::default(),
        }
    }

    pub fn score(&self, player_id: &PlayerId) -> i64 {
        self.scores.get(player_id)
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Players sorted by join time, ties broken by id
    pub fn players_by_join_order(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by(|a, b| (a.joined_at, &a.id).cmp(&(b.joined_at, &b.id)));
        players
    }

    /// History sorted chronologically by `(time, id)`
    pub fn sorted_history(&self) -> Vec<&ActionRecord> {
        let mut records: Vec<&ActionRecord> = self.history.values().collect();
        records.sort_by(|a, b| (a.time, &a.id).cmp(&(b.time, &b.id)));
        records
    }

    /// The last `limit` actions, newest first, with player references
    /// resolved. A record citing a player we have not seen yet renders
    /// as "Unknown" until the players snapshot catches up.
    pub fn feed(&self, limit: usize) -> Vec<FeedEntry> {
        self.sorted_history()
            .into_iter()
            .rev()
            .take(limit)
            .map(|record| {
                let player = self.players.get(&record.player_id);
                FeedEntry {
                    action_id: record.id.clone(),
                    player_name: player
                        .map(|p| p.display_name.clone())
                        .unwrap_or_else(|| UNKNOWN_PLAYER_NAME.to_string()),
                    player_glyph: player
                        .map(|p| p.avatar_glyph.clone())
                        .unwrap_or_else(|| UNKNOWN_PLAYER_GLYPH.to_string()),
                    label: record.label.clone(),
                    time: record.time,
                    vetoed: record.vetoed,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKey;

    fn make_room() -> Room {
        Room::new(RoomCode::parse("TEST").unwrap())
    }

    fn tap(room: &mut Room, id: &str, player: &str, time: i64) {
        let record = ActionRecord {
            id: ActionId::from(id),
            player_id: PlayerId::from(player),
            event_key: EventKey::new("list", 0),
            label: format!("event {id}"),
            time,
            vetoed: false,
        };
        room.history.insert(record.id.clone(), record);
    }

    #[test]
    fn test_feed_newest_first() {
        let mut room = make_room();
        tap(&mut room, "a1", "p1", 2000);
        tap(&mut room, "a2", "p1", 1000);
        tap(&mut room, "a3", "p1", 3000);

        let feed = room.feed(2);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].action_id.as_str(), "a3");
        assert_eq!(feed[1].action_id.as_str(), "a1");
    }

    #[test]
    fn test_feed_unknown_player_fallback() {
        let mut room = make_room();
        tap(&mut room, "a1", "p_missing", 1000);

        let feed = room.feed(10);
        assert_eq!(feed[0].player_name, UNKNOWN_PLAYER_NAME);
        assert_eq!(feed[0].player_glyph, UNKNOWN_PLAYER_GLYPH);
    }

    #[test]
    fn test_feed_resolves_after_player_arrives() {
        let mut room = make_room();
        tap(&mut room, "a1", "p1", 1000);
        room.players.insert(
            PlayerId::from("p1"),
            Player::new(PlayerId::from("p1"), "Ana", "🍿", 500),
        );

        let feed = room.feed(10);
        assert_eq!(feed[0].player_name, "Ana");
    }

    #[test]
    fn test_players_by_join_order() {
        let mut room = make_room();
        room.players.insert(
            PlayerId::from("z_late"),
            Player::new(PlayerId::from("z_late"), "Late", "🔥", 2000),
        );
        room.players.insert(
            PlayerId::from("a_early"),
            Player::new(PlayerId::from("a_early"), "Early", "⭐", 1000),
        );

        let ordered = room.players_by_join_order();
        assert_eq!(ordered[0].display_name, "Early");
        assert_eq!(ordered[1].display_name, "Late");
    }
}
