use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::from_str;
use std::sync::OnceLock;

use crate::error::ContentError;

static LIST_DIR: Dir = include_dir!("src/content/lists");

/// A fixed, ordered master list shipped with the binary.
///
/// Order matters: the daily selection indexes into it, so reordering the
/// JSON changes which topic or tip a given date produces.
#[derive(Deserialize, Clone, Debug)]
pub struct ContentList {
    pub name: String,
    pub size: u32,
    pub items: Vec<String>,
}

impl ContentList {
    pub fn load(name: &str) -> Result<Self, ContentError> {
        let file_name = format!("{name}.json");
        let file = LIST_DIR
            .get_file(&file_name)
            .ok_or_else(|| ContentError::NotFound(file_name.clone()))?;

        let contents = file
            .contents_utf8()
            .ok_or(ContentError::Encoding(file_name))?;

        Ok(from_str(contents)?)
    }
}

fn load_or_empty(name: &str) -> Vec<String> {
    match ContentList::load(name) {
        Ok(list) => list.items,
        Err(e) => {
            tracing::error!(list = name, error = %e, "failed to load master list");
            Vec::new()
        }
    }
}

/// Master list of suggested study topics
pub fn master_topics() -> &'static [String] {
    static TOPICS: OnceLock<Vec<String>> = OnceLock::new();
    TOPICS.get_or_init(|| load_or_empty("topics"))
}

/// Master list of daily tips
pub fn master_tips() -> &'static [String] {
    static TIPS: OnceLock<Vec<String>> = OnceLock::new();
    TIPS.get_or_init(|| load_or_empty("tips"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics_list_loads() {
        let list = ContentList::load("topics").unwrap();
        assert_eq!(list.name, "topics");
        assert_eq!(list.size as usize, list.items.len());
        assert_eq!(list.items.len(), 25);
        assert_eq!(list.items[0], "Quantum Computing");
        assert_eq!(list.items[24], "The History of the Internet");
    }

    #[test]
    fn test_tips_list_loads() {
        let list = ContentList::load("tips").unwrap();
        assert_eq!(list.items.len(), 15);
        assert_eq!(list.size, 15);
    }

    #[test]
    fn test_master_lists_have_no_duplicates() {
        for list in [master_topics(), master_tips()] {
            let mut sorted = list.to_vec();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), list.len());
        }
    }

    #[test]
    fn test_missing_list_is_not_found() {
        let err = ContentList::load("nonexistent").unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));
    }
}
