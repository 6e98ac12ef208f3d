//! SQLite storage layer for Tally
//!
//! Covers everything the engine persists on-device: the durable player
//! identity, custom lists, and the bounded recoverable-session log.
//! Room synchronization state never lives here; that belongs to the
//! backend (or to memory, in local mode).

mod device;
mod lists;
mod migrations;
mod sessions;
mod traits;

use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

use crate::error::Result;
use crate::models::{Room, TallyList};

pub use device::{DeviceProfile, DeviceProfileStore};
pub use lists::ListStore;
pub use sessions::{SessionStore, SessionSummary, MAX_RECOVERABLE_SESSIONS};
pub use traits::{DeviceProfileRepository, ListRepository, SessionRepository, Storage};

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get device profile store
    pub fn device(&self) -> DeviceProfileStore<'_> {
        DeviceProfileStore::new(&self.conn)
    }

    /// Get custom list store
    pub fn lists(&self) -> ListStore<'_> {
        ListStore::new(&self.conn)
    }

    /// Get recoverable session store
    pub fn sessions(&self) -> SessionStore<'_> {
        SessionStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl DeviceProfileRepository for Database {
    fn load_profile(&self) -> Result<Option<DeviceProfile>> {
        self.device().load()
    }

    fn save_profile(&self, profile: &DeviceProfile) -> Result<()> {
        self.device().save(profile)
    }

    fn load_or_create_profile(&self, display_name: &str, now_ms: i64) -> Result<DeviceProfile> {
        self.device().load_or_create(display_name, now_ms)
    }
}

impl ListRepository for Database {
    fn save_list(&self, list: &TallyList) -> Result<()> {
        self.lists().save(list)
    }

    fn list_custom_lists(&self) -> Result<Vec<TallyList>> {
        self.lists().list_custom()
    }

    fn find_list(&self, id: &str) -> Result<Option<TallyList>> {
        self.lists().find(id)
    }

    fn delete_list(&self, id: &str) -> Result<()> {
        self.lists().delete(id)
    }
}

impl SessionRepository for Database {
    fn save_session(&self, room: &Room) -> Result<String> {
        self.sessions().save(room)
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.sessions().list()
    }

    fn load_session(&self, id: &str) -> Result<Option<Room>> {
        self.sessions().load(id)
    }

    fn delete_session(&self, id: &str) -> Result<()> {
        self.sessions().delete(id)
    }
}
