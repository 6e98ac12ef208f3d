//! Room code - short human-readable session identifier

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Room codes are exactly this many characters.
pub const ROOM_CODE_LEN: usize = 4;

/// Alphabet for room codes. Excludes `0`, `1`, `O` and `I`, which are
/// too easy to misread when shouted across a living room.
pub const ROOM_CODE_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// A validated 4-character room code
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Parse a room code, normalizing to uppercase first
    pub fn parse(value: &str) -> Result<Self, Error> {
        let normalized = value.trim().to_ascii_uppercase();
        if normalized.len() != ROOM_CODE_LEN {
            return Err(Error::InvalidRoomCode(format!(
                "expected {} characters, got {}",
                ROOM_CODE_LEN,
                normalized.len()
            )));
        }
        if let Some(ch) = normalized.chars().find(|ch| !ROOM_CODE_ALPHABET.contains(*ch)) {
            return Err(Error::InvalidRoomCode(format!(
                "character {ch:?} is not allowed"
            )));
        }
        Ok(Self(normalized))
    }

    /// Generate a random room code
    pub fn generate<R: rand::Rng>(rng: &mut R) -> Self {
        let alphabet: Vec<char> = ROOM_CODE_ALPHABET.chars().collect();
        let code: String = (0..ROOM_CODE_LEN)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for RoomCode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> String {
        code.0
    }
}
