//! Storage repository traits
//!
//! These traits define the local persistence interface the engine
//! needs, allowing for different implementations (SQLite, mock).

use crate::error::Result;
use crate::models::{Room, TallyList};
use crate::storage::{DeviceProfile, SessionSummary};

/// Device identity operations
pub trait DeviceProfileRepository {
    /// Load the device profile, if one exists
    fn load_profile(&self) -> Result<Option<DeviceProfile>>;

    /// Save the device profile
    fn save_profile(&self, profile: &DeviceProfile) -> Result<()>;

    /// Load or create the device identity under a display name
    fn load_or_create_profile(&self, display_name: &str, now_ms: i64) -> Result<DeviceProfile>;
}

/// Custom list operations
pub trait ListRepository {
    /// Save a custom list
    fn save_list(&self, list: &TallyList) -> Result<()>;

    /// All custom lists, newest first
    fn list_custom_lists(&self) -> Result<Vec<TallyList>>;

    /// Find one custom list
    fn find_list(&self, id: &str) -> Result<Option<TallyList>>;

    /// Delete a custom list
    fn delete_list(&self, id: &str) -> Result<()>;
}

/// Recoverable session operations
pub trait SessionRepository {
    /// Snapshot a room; evicts oldest sessions beyond the cap
    fn save_session(&self, room: &Room) -> Result<String>;

    /// All saved sessions, newest first
    fn list_sessions(&self) -> Result<Vec<SessionSummary>>;

    /// Restore a saved room
    fn load_session(&self, id: &str) -> Result<Option<Room>>;

    /// Delete a saved session
    fn delete_session(&self, id: &str) -> Result<()>;
}

/// Combined local storage interface
pub trait Storage: DeviceProfileRepository + ListRepository + SessionRepository {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where T: DeviceProfileRepository + ListRepository + SessionRepository {}
