//! Player model and team assignment

use serde::{Deserialize, Serialize};

/// Avatar glyphs a device may pick from when it first joins
pub const AVATAR_GLYPHS: &[&str] = &["🎮", "🍿", "🏈", "🎬", "😂", "🔥", "⭐", "🎧"];

/// Device-durable player identifier
///
/// Generated once per device and persisted locally, so the same device
/// always rejoins a room as the same player.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Generate a fresh player id
    pub fn generate<R: rand::Rng>(now_ms: i64, rng: &mut R) -> Self {
        Self(format!("p_{}_{}", now_ms, rng.gen_range(0..1_000_000u32)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Team assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    #[default]
    None,
    A,
    B,
}

impl Team {
    pub fn is_assigned(&self) -> bool {
        !matches!(self, Team::None)
    }

    /// The opposite side; `None` stays `None`
    pub fn opposite(&self) -> Team {
        match self {
            Team::None => Team::None,
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::None => write!(f, "-"),
            Team::A => write!(f, "A"),
            Team::B => write!(f, "B"),
        }
    }
}

/// A participant in a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub avatar_glyph: String,
    /// Team assignment; `None` whenever team mode is disabled
    #[serde(default)]
    pub team: Team,
    /// Join time in epoch millis; orders deterministic team assignment
    pub joined_at: i64,
}

impl Player {
    pub fn new(id: PlayerId, display_name: &str, avatar_glyph: &str, joined_at: i64) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            avatar_glyph: avatar_glyph.to_string(),
            team: Team::None,
            joined_at,
        }
    }

    /// Pick a random avatar glyph for a new device
    pub fn random_glyph<R: rand::Rng>(rng: &mut R) -> &'static str {
        AVATAR_GLYPHS[rng.gen_range(0..AVATAR_GLYPHS.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_unique_enough() {
        let mut rng = rand::thread_rng();
        let a = PlayerId::generate(1000, &mut rng);
        let b = PlayerId::generate(1000, &mut rng);
        assert!(a.as_str().starts_with("p_1000_"));
        // Two ids at the same millisecond still differ in the random suffix
        assert_ne!(a, b);
    }

    #[test]
    fn test_team_opposite() {
        assert_eq!(Team::A.opposite(), Team::B);
        assert_eq!(Team::B.opposite(), Team::A);
        assert_eq!(Team::None.opposite(), Team::None);
    }

    #[test]
    fn test_team_serde_form() {
        assert_eq!(serde_json::to_string(&Team::A).unwrap(), "\"a\"");
        assert_eq!(
            serde_json::from_str::<Team>("\"none\"").unwrap(),
            Team::None
        );
    }
}
