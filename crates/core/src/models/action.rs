//! Action records - one entry per scoring tap

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::models::PlayerId;

/// Identifier for a single action record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn generate() -> Self {
        Self(format!("a_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies a semantic event within its source list.
///
/// This is the unit of rate limiting: the same list entry tapped twice
/// on one device within the cooldown window fires only once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventKey {
    pub list_id: String,
    pub index: u32,
}

impl EventKey {
    pub fn new(list_id: &str, index: u32) -> Self {
        Self {
            list_id: list_id.to_string(),
            index,
        }
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.list_id, self.index)
    }
}

impl std::str::FromStr for EventKey {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (list_id, index) = value
            .rsplit_once('|')
            .ok_or_else(|| Error::InvalidEventKey(value.to_string()))?;
        if list_id.is_empty() {
            return Err(Error::InvalidEventKey(value.to_string()));
        }
        let index: u32 = index
            .parse()
            .map_err(|_| Error::InvalidEventKey(value.to_string()))?;
        Ok(Self::new(list_id, index))
    }
}

impl TryFrom<String> for EventKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventKey> for String {
    fn from(key: EventKey) -> String {
        key.to_string()
    }
}

/// One scoring tap.
///
/// Append-only and immutable except for `vetoed`, which may flip
/// `false -> true` exactly once and never back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: ActionId,
    pub player_id: PlayerId,
    pub event_key: EventKey,
    pub label: String,
    /// Epoch millis on the acting device's clock (advisory ordering)
    pub time: i64,
    #[serde(default)]
    pub vetoed: bool,
}

impl ActionRecord {
    pub fn new(player_id: PlayerId, event_key: EventKey, label: &str, time: i64) -> Self {
        Self {
            id: ActionId::generate(),
            player_id,
            event_key,
            label: label.to_string(),
            time,
            vetoed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_key_round_trip() {
        let key = EventKey::new("movie_plot", 7);
        assert_eq!(key.to_string(), "movie_plot|7");
        assert_eq!("movie_plot|7".parse::<EventKey>().unwrap(), key);
    }

    #[test]
    fn test_event_key_rejects_garbage() {
        assert!("".parse::<EventKey>().is_err());
        assert!("no-separator".parse::<EventKey>().is_err());
        assert!("|3".parse::<EventKey>().is_err());
        assert!("list|notanumber".parse::<EventKey>().is_err());
    }

    #[test]
    fn test_action_ids_unique() {
        assert_ne!(ActionId::generate(), ActionId::generate());
    }
}
