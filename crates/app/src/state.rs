//! Application state management

use std::path::PathBuf;

use directories::ProjectDirs;
use tally_core::models::{sample_lists, ListSource, TallyList};
use tally_core::storage::DeviceProfile;
use tally_core::{Database, Error, Result};
use tally_sync::RoomSync;

/// Main application state
pub struct AppState {
    pub db: Database,
    pub profile: DeviceProfile,
    /// Sample lists first, then this device's custom lists
    pub lists: Vec<TallyList>,
    pub active_list: usize,
    pub session: Option<RoomSync>,
}

impl AppState {
    pub fn new(display_name: &str) -> Result<Self> {
        let db_path = Self::data_path()?.join("tally.db");

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        Self::with_database(db, display_name)
    }

    pub fn with_database(db: Database, display_name: &str) -> Result<Self> {
        let profile = db
            .device()
            .load_or_create(display_name, tally_sync::now_ms())?;
        let mut lists = sample_lists();
        lists.extend(db.lists().list_custom()?);

        Ok(Self {
            db,
            profile,
            lists,
            active_list: 0,
            session: None,
        })
    }

    fn data_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "onyx", "tally").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;

        Ok(dirs.data_dir().to_path_buf())
    }

    /// The list taps are scored against
    pub fn current_list(&self) -> &TallyList {
        &self.lists[self.active_list]
    }

    /// Re-read custom lists from storage, keeping the selection if its
    /// list survived
    pub fn reload_lists(&mut self) -> Result<()> {
        let selected = self.current_list().id.clone();
        let mut lists = sample_lists();
        lists.extend(self.db.lists().list_custom()?);
        self.active_list = lists
            .iter()
            .position(|list| list.id == selected)
            .unwrap_or(0);
        self.lists = lists;
        Ok(())
    }

    /// Save a custom list and select it
    pub fn add_custom_list(&mut self, name: &str, category: &str, events: Vec<String>) -> Result<()> {
        let list = TallyList::custom(name, category, events);
        let id = list.id.clone();
        self.db.lists().save(&list)?;
        self.reload_lists()?;
        if let Some(idx) = self.lists.iter().position(|l| l.id == id) {
            self.active_list = idx;
        }
        Ok(())
    }

    /// Delete a custom list. Sample lists are not deletable.
    pub fn delete_custom_list(&mut self, index: usize) -> Result<()> {
        let Some(list) = self.lists.get(index) else {
            return Err(Error::NotFound(format!("no list #{index}")));
        };
        if list.source != ListSource::Custom {
            return Err(Error::InvalidOperation(
                "sample lists cannot be deleted".to_string(),
            ));
        }
        let id = list.id.clone();
        self.db.lists().delete(&id)?;
        self.reload_lists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> AppState {
        AppState::with_database(Database::open_in_memory().unwrap(), "Ana").unwrap()
    }

    #[test]
    fn test_on_disk_identity_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");

        let first = AppState::with_database(Database::open(&path).unwrap(), "Ana").unwrap();
        let player_id = first.profile.player_id.clone();
        drop(first);

        // A second launch keeps the stored identity, name included
        let second =
            AppState::with_database(Database::open(&path).unwrap(), "SomeoneElse").unwrap();
        assert_eq!(second.profile.player_id, player_id);
        assert_eq!(second.profile.display_name, "Ana");
    }

    #[test]
    fn test_starts_with_sample_lists() {
        let app = app();
        assert!(!app.lists.is_empty());
        assert_eq!(app.current_list().id, app.lists[0].id);
    }

    #[test]
    fn test_custom_list_round_trip() {
        let mut app = app();
        app.add_custom_list("Our Show", "Series", vec!["Event one".to_string()])
            .unwrap();
        assert_eq!(app.current_list().name, "Our Show");

        let index = app.active_list;
        app.delete_custom_list(index).unwrap();
        assert!(app.lists.iter().all(|l| l.name != "Our Show"));
        assert_eq!(app.active_list, 0);
    }

    #[test]
    fn test_sample_lists_not_deletable() {
        let mut app = app();
        assert!(app.delete_custom_list(0).is_err());
    }
}
