use itertools::Itertools;
use std::sync::Arc;

use crate::models::StudySession;
use crate::storage::{load_json, save_json, KeyValueStore, SESSIONS_KEY};

/// Persisted collection of study sessions.
///
/// Every mutating call writes the full collection straight through to the
/// store; nothing is buffered. Persistence failures are logged and never
/// surface to the caller.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All persisted sessions, or an empty list if nothing readable is stored
    pub fn get_all(&self) -> Vec<StudySession> {
        load_json(self.store.as_ref(), SESSIONS_KEY).unwrap_or_default()
    }

    /// Replace the session with the same id in place, or append it.
    /// Returns the new collection, which is also what gets persisted.
    pub fn upsert(&self, history: &[StudySession], session: StudySession) -> Vec<StudySession> {
        let mut updated = history.to_vec();
        match updated.iter().position(|s| s.id == session.id) {
            Some(idx) => updated[idx] = session,
            None => updated.push(session),
        }

        self.save_all(&updated);
        updated
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(SESSIONS_KEY) {
            tracing::warn!(error = %e, "failed to clear study history");
        }
    }

    fn save_all(&self, sessions: &[StudySession]) {
        if let Err(e) = save_json(self.store.as_ref(), SESSIONS_KEY, sessions) {
            tracing::warn!(error = %e, "failed to save study history");
        }
    }
}

/// Display order: most recently accessed first, ties broken by id
pub fn sorted_by_recent(history: &[StudySession]) -> Vec<&StudySession> {
    history
        .iter()
        .sorted_by(|a, b| {
            b.last_accessed
                .cmp(&a.last_accessed)
                .then_with(|| b.id.cmp(&a.id))
        })
        .collect()
}

pub fn find<'a>(history: &'a [StudySession], id: &str) -> Option<&'a StudySession> {
    history.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::models::{LearningLevel, Message};
    use crate::storage::MemoryStore;

    fn session(id: &str, topic: &str, last_accessed: i64) -> StudySession {
        StudySession {
            id: id.to_string(),
            topic: topic.to_string(),
            learning_level: LearningLevel::Beginner,
            chat_history: vec![Message::user_text(1, format!("I want to learn about: {topic}"))],
            last_accessed,
        }
    }

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStore::new()))
    }

    /// Store whose every operation fails
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> crate::storage::Result<Option<String>> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }
        fn set(&self, _key: &str, _value: &str) -> crate::storage::Result<()> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }
        fn remove(&self, _key: &str) -> crate::storage::Result<()> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }
    }

    #[test]
    fn test_empty_store_has_no_sessions() {
        assert!(store().get_all().is_empty());
    }

    #[test]
    fn test_upsert_appends_new_session() {
        let store = store();
        let h = store.upsert(&[], session("1", "Black Holes", 10));
        let h = store.upsert(&h, session("2", "Game Theory", 20));
        assert_eq!(h.len(), 2);
        assert_eq!(h[1].id, "2");
        assert_eq!(store.get_all(), h);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let store = store();
        let h = store.upsert(&[], session("1", "Black Holes", 10));
        let h = store.upsert(&h, session("2", "Game Theory", 20));

        let mut replacement = session("1", "Photosynthesis", 30);
        replacement.learning_level = LearningLevel::Advanced;
        replacement.chat_history.clear();
        let h2 = store.upsert(&h, replacement.clone());

        assert_eq!(h2.len(), 2);
        assert_eq!(h2[0], replacement);
        assert_eq!(h2[1].id, "2");
        // input left untouched
        assert_eq!(h[0].topic, "Black Holes");
        assert_eq!(store.get_all(), h2);
    }

    #[test]
    fn test_clear_then_get_all_is_empty() {
        let store = store();
        store.upsert(&[], session("1", "Black Holes", 10));
        store.clear();
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn test_malformed_history_reads_as_empty() {
        let backing = Arc::new(MemoryStore::new());
        backing.set(SESSIONS_KEY, "[{\"id\": 1").unwrap();
        let store = SessionStore::new(backing);
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn test_broken_store_is_not_fatal() {
        let store = SessionStore::new(Arc::new(BrokenStore));
        assert!(store.get_all().is_empty());
        let h = store.upsert(&[], session("1", "Black Holes", 10));
        assert_eq!(h.len(), 1);
        store.clear();
    }

    #[test]
    fn test_sorted_by_recent() {
        let history = vec![
            session("1", "a", 10),
            session("2", "b", 30),
            session("3", "c", 20),
            session("4", "d", 30),
        ];
        let ids: Vec<&str> = sorted_by_recent(&history)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["4", "2", "3", "1"]);
    }

    #[test]
    fn test_find_by_id() {
        let history = vec![session("1", "a", 10), session("2", "b", 20)];
        assert_eq!(find(&history, "2").map(|s| s.topic.as_str()), Some("b"));
        assert!(find(&history, "9").is_none());
    }
}
