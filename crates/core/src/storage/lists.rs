//! Custom list persistence
//!
//! Sample lists ship in code; only user-authored lists are stored.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{ListSource, TallyList};

/// Custom list store
pub struct ListStore<'a> {
    conn: &'a Connection,
}

impl<'a> ListStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Save a custom list. Sample lists are code, not rows.
    pub fn save(&self, list: &TallyList) -> Result<()> {
        if list.source != ListSource::Custom {
            return Err(Error::InvalidOperation(
                "only custom lists can be saved".to_string(),
            ));
        }
        let events_json = serde_json::to_string(&list.events)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO custom_lists (id, name, category, events_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                list.id,
                list.name,
                list.category,
                events_json,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All custom lists, most recently created first
    pub fn list_custom(&self) -> Result<Vec<TallyList>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category, events_json FROM custom_lists
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let category: String = row.get(2)?;
            let events_json: String = row.get(3)?;
            Ok((id, name, category, events_json))
        })?;

        let mut lists = Vec::new();
        for row in rows {
            let (id, name, category, events_json) = row?;
            let events: Vec<String> = serde_json::from_str(&events_json)?;
            lists.push(TallyList {
                id,
                source: ListSource::Custom,
                name,
                category,
                events,
            });
        }
        Ok(lists)
    }

    /// Find one custom list by id
    pub fn find(&self, id: &str) -> Result<Option<TallyList>> {
        let result = self.conn.query_row(
            "SELECT name, category, events_json FROM custom_lists WHERE id = ?1",
            params![id],
            |row| {
                let name: String = row.get(0)?;
                let category: String = row.get(1)?;
                let events_json: String = row.get(2)?;
                Ok((name, category, events_json))
            },
        );

        match result {
            Ok((name, category, events_json)) => {
                let events: Vec<String> = serde_json::from_str(&events_json)?;
                Ok(Some(TallyList {
                    id: id.to_string(),
                    source: ListSource::Custom,
                    name,
                    category,
                    events,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a custom list
    pub fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM custom_lists WHERE id = ?1", params![id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_lists;
    use crate::storage::Database;

    #[test]
    fn test_save_and_find() {
        let db = Database::open_in_memory().unwrap();
        let store = ListStore::new(db.conn());

        let list = TallyList::custom("Our Show", "Series", vec!["Event one".to_string()]);
        store.save(&list).unwrap();

        let found = store.find(&list.id).unwrap().unwrap();
        assert_eq!(found, list);
    }

    #[test]
    fn test_sample_lists_rejected() {
        let db = Database::open_in_memory().unwrap();
        let store = ListStore::new(db.conn());
        assert!(store.save(&sample_lists()[0]).is_err());
    }

    #[test]
    fn test_delete() {
        let db = Database::open_in_memory().unwrap();
        let store = ListStore::new(db.conn());

        let list = TallyList::custom("Our Show", "Series", vec!["Event".to_string()]);
        store.save(&list).unwrap();
        store.delete(&list.id).unwrap();
        assert!(store.find(&list.id).unwrap().is_none());
        assert!(store.list_custom().unwrap().is_empty());
    }
}
