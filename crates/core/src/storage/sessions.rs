//! Recoverable session snapshots
//!
//! A finished or interrupted room can be snapshotted here and restored
//! later. The log is bounded: saving past the cap evicts the oldest
//! snapshots first.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Room;

/// How many recoverable sessions are kept before oldest-first eviction
pub const MAX_RECOVERABLE_SESSIONS: usize = 10;

/// One saved session, without the snapshot payload
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub room_code: String,
    pub saved_at: DateTime<Utc>,
}

/// Session snapshot store
pub struct SessionStore<'a> {
    conn: &'a Connection,
}

impl<'a> SessionStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Snapshot a room. Returns the new session id.
    pub fn save(&self, room: &Room) -> Result<String> {
        let id = format!("s_{}", Uuid::new_v4().simple());
        let snapshot_json = serde_json::to_string(room)?;
        self.conn.execute(
            "INSERT INTO sessions (id, room_code, snapshot_json, saved_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id,
                room.code.as_str(),
                snapshot_json,
                Utc::now().to_rfc3339(),
            ],
        )?;
        self.evict_beyond_cap()?;
        Ok(id)
    }

    /// All saved sessions, newest first
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, room_code, saved_at FROM sessions
             ORDER BY saved_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let room_code: String = row.get(1)?;
            let saved_at: String = row.get(2)?;
            Ok((id, room_code, saved_at))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, room_code, saved_at) = row?;
            let saved_at = DateTime::parse_from_rfc3339(&saved_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            sessions.push(SessionSummary {
                id,
                room_code,
                saved_at,
            });
        }
        Ok(sessions)
    }

    /// Restore a saved room snapshot
    pub fn load(&self, id: &str) -> Result<Option<Room>> {
        let result = self.conn.query_row(
            "SELECT snapshot_json FROM sessions WHERE id = ?1",
            params![id],
            |row| {
                let snapshot_json: String = row.get(0)?;
                Ok(snapshot_json)
            },
        );

        match result {
            Ok(snapshot_json) => {
                let room: Room = serde_json::from_str(&snapshot_json)?;
                Ok(Some(room))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete one saved session
    pub fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn evict_beyond_cap(&self) -> Result<()> {
        let evicted = self.conn.execute(
            "DELETE FROM sessions WHERE id NOT IN (
                SELECT id FROM sessions ORDER BY saved_at DESC, id DESC LIMIT ?1
            )",
            params![MAX_RECOVERABLE_SESSIONS as i64],
        )?;
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted oldest recoverable sessions");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Player, PlayerId, RoomCode};
    use crate::storage::Database;

    fn make_room(code: &str) -> Room {
        let mut room = Room::new(RoomCode::parse(code).unwrap());
        room.players.insert(
            PlayerId::from("p1"),
            Player::new(PlayerId::from("p1"), "Ana", "⭐", 100),
        );
        room.scores.ensure(&PlayerId::from("p1"));
        room
    }

    #[test]
    fn test_save_load_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let store = SessionStore::new(db.conn());

        let room = make_room("ABCD");
        let id = store.save(&room).unwrap();
        let restored = store.load(&id).unwrap().unwrap();
        assert_eq!(restored, room);
    }

    #[test]
    fn test_load_missing_session() {
        let db = Database::open_in_memory().unwrap();
        let store = SessionStore::new(db.conn());
        assert!(store.load("s_missing").unwrap().is_none());
    }

    #[test]
    fn test_bounded_eviction_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        let store = SessionStore::new(db.conn());

        let mut ids = Vec::new();
        for _ in 0..(MAX_RECOVERABLE_SESSIONS + 3) {
            ids.push(store.save(&make_room("ABCD")).unwrap());
        }

        let sessions = store.list().unwrap();
        assert_eq!(sessions.len(), MAX_RECOVERABLE_SESSIONS);

        // The first three saves were evicted
        for old in &ids[..3] {
            assert!(store.load(old).unwrap().is_none());
        }
        // The newest survives
        assert!(store.load(ids.last().unwrap()).unwrap().is_some());
    }

    #[test]
    fn test_delete() {
        let db = Database::open_in_memory().unwrap();
        let store = SessionStore::new(db.conn());

        let id = store.save(&make_room("ABCD")).unwrap();
        store.delete(&id).unwrap();
        assert!(store.load(&id).unwrap().is_none());
    }
}
