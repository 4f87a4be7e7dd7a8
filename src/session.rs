use std::sync::Arc;

use crate::ai::ChatSession;
use crate::models::{last_ai_text, LearningLevel, Message, StudySession};
use crate::util::MessageIdGen;

/// The session currently open in the tutor.
///
/// `loading` is set while a request to the AI service is outstanding; at
/// most one request per session can be in flight.
pub struct ActiveSession {
    pub id: String,
    pub topic: String,
    pub level: LearningLevel,
    pub chat_history: Vec<Message>,
    pub loading: bool,
    pub(crate) chat: Arc<dyn ChatSession>,
    ids: MessageIdGen,
}

impl ActiveSession {
    pub fn new(id: String, topic: String, level: LearningLevel, chat: Arc<dyn ChatSession>) -> Self {
        Self {
            id,
            topic,
            level,
            chat_history: Vec::new(),
            loading: false,
            chat,
            ids: MessageIdGen::default(),
        }
    }

    /// Reopen a persisted session with a fresh conversation handle
    pub fn resume(session: &StudySession, chat: Arc<dyn ChatSession>) -> Self {
        let last_id = session
            .chat_history
            .iter()
            .map(|m| m.id)
            .max()
            .unwrap_or_default();
        Self {
            id: session.id.clone(),
            topic: session.topic.clone(),
            level: session.learning_level,
            chat_history: session.chat_history.clone(),
            loading: false,
            chat,
            ids: MessageIdGen::starting_after(last_id),
        }
    }

    pub fn next_message_id(&mut self) -> i64 {
        self.ids.next_id()
    }

    pub fn last_ai_text(&self) -> Option<&str> {
        last_ai_text(&self.chat_history)
    }

    /// Snapshot for persistence; each save replaces the whole record
    pub fn to_study_session(&self, last_accessed: i64) -> StudySession {
        StudySession {
            id: self.id.clone(),
            topic: self.topic.clone(),
            learning_level: self.level,
            chat_history: self.chat_history.clone(),
            last_accessed,
        }
    }

    /// Key points in message order
    pub fn key_points(&self) -> Vec<&Message> {
        let mut points: Vec<&Message> = self.chat_history.iter().filter(|m| m.is_key_point).collect();
        points.sort_by_key(|m| m.id);
        points
    }
}

impl std::fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSession")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("level", &self.level)
            .field("messages", &self.chat_history.len())
            .field("loading", &self.loading)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl ChatSession for Silent {
        async fn send_message(&self, _text: &str) -> Result<String, AiError> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_resume_continues_ids_after_existing_messages() {
        let far_future = i64::MAX / 2;
        let stored = StudySession {
            id: "1".into(),
            topic: "Game Theory".into(),
            learning_level: LearningLevel::Basic,
            chat_history: vec![Message::user_text(far_future, "x")],
            last_accessed: 0,
        };
        let mut active = ActiveSession::resume(&stored, Arc::new(Silent));
        assert_eq!(active.level, LearningLevel::Basic);
        assert_eq!(active.next_message_id(), far_future + 1);
    }

    #[test]
    fn test_snapshot_replaces_last_accessed() {
        let active = ActiveSession::new("7".into(), "Black Holes".into(), LearningLevel::Beginner, Arc::new(Silent));
        let snap = active.to_study_session(42);
        assert_eq!(snap.id, "7");
        assert_eq!(snap.last_accessed, 42);
        assert!(snap.chat_history.is_empty());
    }

    #[test]
    fn test_key_points_sorted_by_id() {
        let mut active = ActiveSession::new("7".into(), "t".into(), LearningLevel::Beginner, Arc::new(Silent));
        let mut a = Message::ai_text(30, "later");
        a.is_key_point = true;
        let mut b = Message::ai_text(10, "earlier");
        b.is_key_point = true;
        active.chat_history = vec![a, Message::ai_text(20, "plain"), b];

        let ids: Vec<i64> = active.key_points().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![10, 30]);
    }
}
