//! Device identity persistence
//!
//! Each device acts as exactly one durable player. The id is generated
//! on first use and never changes, so the same device always rejoins a
//! room as the same player.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::{Player, PlayerId};

/// The durable identity of this device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub player_id: PlayerId,
    pub display_name: String,
    pub avatar_glyph: String,
}

impl DeviceProfile {
    /// The player this device joins rooms as
    pub fn as_player(&self, joined_at: i64) -> Player {
        Player::new(
            self.player_id.clone(),
            &self.display_name,
            &self.avatar_glyph,
            joined_at,
        )
    }
}

/// Device profile store
pub struct DeviceProfileStore<'a> {
    conn: &'a Connection,
}

impl<'a> DeviceProfileStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Save the device profile, replacing any existing one
    pub fn save(&self, profile: &DeviceProfile) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO device_profile
             (id, player_id, display_name, avatar_glyph, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                profile.player_id.as_str(),
                profile.display_name,
                profile.avatar_glyph,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load the device profile, if one has been created
    pub fn load(&self) -> Result<Option<DeviceProfile>> {
        let result = self.conn.query_row(
            "SELECT player_id, display_name, avatar_glyph FROM device_profile WHERE id = 1",
            [],
            |row| {
                let player_id: String = row.get(0)?;
                let display_name: String = row.get(1)?;
                let avatar_glyph: String = row.get(2)?;
                Ok((player_id, display_name, avatar_glyph))
            },
        );

        match result {
            Ok((player_id, display_name, avatar_glyph)) => Ok(Some(DeviceProfile {
                player_id: PlayerId::from(player_id.as_str()),
                display_name,
                avatar_glyph,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the profile or create a fresh identity under `display_name`
    pub fn load_or_create(&self, display_name: &str, now_ms: i64) -> Result<DeviceProfile> {
        if let Some(profile) = self.load()? {
            return Ok(profile);
        }
        let mut rng = rand::thread_rng();
        let profile = DeviceProfile {
            player_id: PlayerId::generate(now_ms, &mut rng),
            display_name: display_name.to_string(),
            avatar_glyph: Player::random_glyph(&mut rng).to_string(),
        };
        self.save(&profile)?;
        tracing::info!(player_id = %profile.player_id, "Created device identity");
        Ok(profile)
    }

    /// Update only the display name, keeping the durable id
    pub fn rename(&self, display_name: &str) -> Result<()> {
        let profile = self.load()?.ok_or_else(|| {
            crate::error::Error::NotFound("device profile not created yet".to_string())
        })?;
        self.save(&DeviceProfile {
            display_name: display_name.to_string(),
            ..profile
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_load_or_create_then_load() {
        let db = Database::open_in_memory().unwrap();
        let store = DeviceProfileStore::new(db.conn());

        let created = store.load_or_create("Ana", 1_000).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(created, loaded);
    }

    #[test]
    fn test_identity_is_stable() {
        let db = Database::open_in_memory().unwrap();
        let store = DeviceProfileStore::new(db.conn());

        let first = store.load_or_create("Ana", 1_000).unwrap();
        let second = store.load_or_create("SomeoneElse", 2_000).unwrap();
        assert_eq!(first.player_id, second.player_id);
        assert_eq!(second.display_name, "Ana");
    }

    #[test]
    fn test_rename_keeps_id() {
        let db = Database::open_in_memory().unwrap();
        let store = DeviceProfileStore::new(db.conn());

        let created = store.load_or_create("Ana", 1_000).unwrap();
        store.rename("Annie").unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.player_id, created.player_id);
        assert_eq!(loaded.display_name, "Annie");
    }

    #[test]
    fn test_rename_without_profile_fails() {
        let db = Database::open_in_memory().unwrap();
        let store = DeviceProfileStore::new(db.conn());
        assert!(store.rename("Ana").is_err());
    }
}
