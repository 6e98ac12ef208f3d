//! Tally lists - the catalogs of events players tap against

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::EventKey;

/// Where a list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListSource {
    /// Shipped with the app
    Sample,
    /// Authored on this device
    Custom,
}

/// A named list of tappable events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyList {
    pub id: String,
    pub source: ListSource,
    pub name: String,
    pub category: String,
    pub events: Vec<String>,
}

impl TallyList {
    /// Create a custom list with a fresh id
    pub fn custom(name: &str, category: &str, events: Vec<String>) -> Self {
        Self {
            id: format!("c_{}", Uuid::new_v4().simple()),
            source: ListSource::Custom,
            name: name.to_string(),
            category: category.to_string(),
            events,
        }
    }

    pub fn event_key(&self, index: u32) -> EventKey {
        EventKey::new(&self.id, index)
    }

    /// All events with their keys, in list order
    pub fn keyed_events(&self) -> impl Iterator<Item = (EventKey, &str)> {
        self.events
            .iter()
            .enumerate()
            .map(|(idx, label)| (EventKey::new(&self.id, idx as u32), label.as_str()))
    }
}

/// The built-in starter lists
pub fn sample_lists() -> Vec<TallyList> {
    vec![
        TallyList {
            id: "movie_plot".to_string(),
            source: ListSource::Sample,
            name: "Movie Night – Plot Twists".to_string(),
            category: "Movie".to_string(),
            events: vec![
                "Someone says \u{201c}I have a bad feeling about this\u{201d}".to_string(),
                "Phone rings at the worst possible moment".to_string(),
                "Jump scare or loud sting".to_string(),
                "Villain explains their master plan".to_string(),
                "Hero ignores obvious warning".to_string(),
                "Dramatic slow clap".to_string(),
                "Flashback explains hidden truth".to_string(),
                "Fake-out death".to_string(),
            ],
        },
        TallyList {
            id: "sitcom_bingo".to_string(),
            source: ListSource::Sample,
            name: "Sitcom – Laugh Track Bingo".to_string(),
            category: "Series".to_string(),
            events: vec![
                "Door slam for comedic effect".to_string(),
                "Obvious studio audience laugh".to_string(),
                "Awkward silence after a joke".to_string(),
                "Character enters to applause".to_string(),
                "Catchphrase moment".to_string(),
                "Misunderstood conversation".to_string(),
                "Group hug to end scene".to_string(),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_lists_nonempty() {
        let lists = sample_lists();
        assert!(!lists.is_empty());
        for list in &lists {
            assert_eq!(list.source, ListSource::Sample);
            assert!(!list.events.is_empty());
        }
    }

    #[test]
    fn test_keyed_events_match_indices() {
        let list = sample_lists().remove(0);
        let keyed: Vec<_> = list.keyed_events().collect();
        assert_eq!(keyed.len(), list.events.len());
        assert_eq!(keyed[3].0, EventKey::new(&list.id, 3));
        assert_eq!(keyed[3].1, list.events[3]);
    }

    #[test]
    fn test_custom_list_gets_custom_id() {
        let list = TallyList::custom("Our Show", "Series", vec!["Event".to_string()]);
        assert!(list.id.starts_with("c_"));
        assert_eq!(list.source, ListSource::Custom);
    }
}
