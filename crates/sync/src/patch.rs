//! Remote snapshot decoding
//!
//! The backend delivers whole-collection snapshots, one sub-map at a
//! time, with no ordering guarantee across sub-maps. Each snapshot is
//! decoded tolerantly: an entry that fails to parse is logged and
//! skipped rather than poisoning the whole patch, and a missing
//! collection decodes as empty.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use tally_core::models::{ActionId, ActionRecord, Player, PlayerId, RoomSettings};

/// Which sub-map of the room a patch replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomSection {
    Players,
    Scores,
    History,
    Settings,
}

/// One whole-sub-map replacement received from the backend
#[derive(Debug, Clone)]
pub enum RoomPatch {
    Players(BTreeMap<PlayerId, Player>),
    Scores(BTreeMap<PlayerId, i64>),
    History(BTreeMap<ActionId, ActionRecord>),
    Settings(RoomSettings),
}

impl RoomPatch {
    pub fn section(&self) -> RoomSection {
        match self {
            RoomPatch::Players(_) => RoomSection::Players,
            RoomPatch::Scores(_) => RoomSection::Scores,
            RoomPatch::History(_) => RoomSection::History,
            RoomPatch::Settings(_) => RoomSection::Settings,
        }
    }

    pub fn players_from_value(value: Value) -> Self {
        RoomPatch::Players(decode_players(value))
    }

    pub fn scores_from_value(value: Value) -> Self {
        RoomPatch::Scores(decode_scores(value))
    }

    pub fn history_from_value(value: Value) -> Self {
        RoomPatch::History(decode_history(value))
    }

    pub fn settings_from_value(value: Value) -> Self {
        RoomPatch::Settings(decode_settings(value))
    }
}

pub fn decode_players(value: Value) -> BTreeMap<PlayerId, Player> {
    let mut players = BTreeMap::new();
    if let Value::Object(map) = value {
        for (key, entry) in map {
            match serde_json::from_value::<Player>(entry) {
                Ok(mut player) => {
                    // The backend key is canonical
                    if player.id.as_str() != key {
                        player.id = PlayerId::from(key.as_str());
                    }
                    players.insert(player.id.clone(), player);
                }
                Err(err) => warn!(%key, %err, "Skipping malformed player entry"),
            }
        }
    }
    players
}

pub fn decode_scores(value: Value) -> BTreeMap<PlayerId, i64> {
    let mut scores = BTreeMap::new();
    if let Value::Object(map) = value {
        for (key, entry) in map {
            match entry.as_i64() {
                Some(score) => {
                    scores.insert(PlayerId::from(key.as_str()), score);
                }
                None => warn!(%key, "Skipping non-integer score entry"),
            }
        }
    }
    scores
}

pub fn decode_history(value: Value) -> BTreeMap<ActionId, ActionRecord> {
    let mut history = BTreeMap::new();
    if let Value::Object(map) = value {
        for (key, entry) in map {
            match serde_json::from_value::<ActionRecord>(entry) {
                Ok(mut record) => {
                    if record.id.as_str() != key {
                        record.id = ActionId::from(key.as_str());
                    }
                    history.insert(record.id.clone(), record);
                }
                Err(err) => warn!(%key, %err, "Skipping malformed history entry"),
            }
        }
    }
    history
}

pub fn decode_settings(value: Value) -> RoomSettings {
    // Settings absent is a normal state for a fresh room
    match value {
        Value::Null => RoomSettings::default(),
        other => serde_json::from_value::<RoomSettings>(other).unwrap_or_else(|err| {
            warn!(%err, "Malformed settings snapshot, using defaults");
            RoomSettings::default()
        }),
    }
}
