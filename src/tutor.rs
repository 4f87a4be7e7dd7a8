//! Turns study actions into requests for the AI service and folds the
//! replies back into the active session's message log.
//!
//! A request goes through three steps so the UI never blocks on the network:
//! [`Tutor::prepare`] (or [`Tutor::start`]) records the user's side and marks
//! the session loading, [`PendingRequest::run`] talks to the service, and
//! [`Tutor::finish`] appends the reply and clears the loading flag.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::ai::{generate_practice_problem, ChatCollaborator, ChatSession};
use crate::history::{self, SessionStore};
use crate::models::{LearningLevel, Message, PracticeProblemData, StudyMode, StudySession};
use crate::session::ActiveSession;
use crate::util::now_millis;

const EASTER_EGG_TRIGGER: &str = "who is faiz";
const EASTER_EGG_REPLY: &str = "faizdevhub@gmail.com with name is a person who trained me";
const EASTER_EGG_DELAY: Duration = Duration::from_millis(500);

const START_FAILED: &str =
    "Sorry, I couldn't start the session. Please check your API key and try again.";
const ACTION_FAILED: &str = "Sorry, I encountered an error. Please try again.";
const TRANSLATE_FAILED: &str = "Sorry, I encountered an error during translation. Please try again.";
const MESSAGE_FAILED: &str = "Sorry, I couldn't process your message. Please try again.";

/// What the user asked for in an active session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TutorAction {
    Explain,
    Simplify,
    Practice,
    Translate { language: String },
    Message(String),
}

impl TutorAction {
    pub fn mode(&self) -> Option<StudyMode> {
        match self {
            TutorAction::Explain => Some(StudyMode::Explain),
            TutorAction::Simplify => Some(StudyMode::Simplify),
            TutorAction::Practice => Some(StudyMode::Practice),
            TutorAction::Translate { .. } => Some(StudyMode::Translate),
            TutorAction::Message(_) => None,
        }
    }
}

enum RequestKind {
    Chat {
        chat: Arc<dyn ChatSession>,
        prompt: String,
        failure_text: &'static str,
    },
    Practice {
        collaborator: Arc<dyn ChatCollaborator>,
        topic: String,
        level: LearningLevel,
    },
    Canned {
        text: String,
        delay: Duration,
    },
}

/// A request that has been recorded in the log but not yet answered
pub struct PendingRequest {
    session_id: String,
    label: String,
    kind: RequestKind,
}

impl PendingRequest {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Talk to the AI service. Never fails: errors become apology text.
    pub async fn run(self) -> Reply {
        let content = match self.kind {
            RequestKind::Chat {
                chat,
                prompt,
                failure_text,
            } => match chat.send_message(&prompt).await {
                Ok(text) => ReplyContent::Text(text),
                Err(e) => {
                    tracing::error!(action = %self.label, error = %e, "AI request failed");
                    ReplyContent::Text(failure_text.to_string())
                }
            },
            RequestKind::Practice {
                collaborator,
                topic,
                level,
            } => ReplyContent::Problem(
                generate_practice_problem(collaborator.as_ref(), &topic, level).await,
            ),
            RequestKind::Canned { text, delay } => {
                tokio::time::sleep(delay).await;
                ReplyContent::Text(text)
            }
        };

        Reply {
            session_id: self.session_id,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyContent {
    Text(String),
    Problem(PracticeProblemData),
}

/// The AI side of an exchange, ready to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub session_id: String,
    pub content: ReplyContent,
}

pub struct Tutor {
    collaborator: Arc<dyn ChatCollaborator>,
    sessions: SessionStore,
    history: Vec<StudySession>,
    active: Option<ActiveSession>,
    /// Sessions with a request still out, whether or not they are active
    in_flight: HashSet<String>,
}

impl Tutor {
    pub fn new(collaborator: Arc<dyn ChatCollaborator>, sessions: SessionStore) -> Self {
        let history = sessions.get_all();
        tracing::debug!(sessions = history.len(), "loaded study history");
        Self {
            collaborator,
            sessions,
            history,
            active: None,
            in_flight: HashSet::new(),
        }
    }

    pub fn history(&self) -> &[StudySession] {
        &self.history
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.active.as_ref().is_some_and(|s| s.loading)
    }

    /// Open a new session on `topic` and ask for an introduction.
    /// Returns `None` for a blank topic.
    pub fn start(&mut self, topic: &str, level: LearningLevel) -> Option<PendingRequest> {
        let topic = topic.trim();
        if topic.is_empty() {
            return None;
        }

        let chat = self.collaborator.start_chat(level);
        let mut session = ActiveSession::new(now_millis().to_string(), topic.to_string(), level, chat.clone());
        let id = session.next_message_id();
        session
            .chat_history
            .push(Message::user_text(id, format!("I want to learn about: {topic}")));
        session.loading = true;

        tracing::info!(session = %session.id, topic, %level, "starting study session");

        let pending = PendingRequest {
            session_id: session.id.clone(),
            label: "START".to_string(),
            kind: RequestKind::Chat {
                chat,
                prompt: format!("Explain the basics of \"{topic}\". I am a {level} learner."),
                failure_text: START_FAILED,
            },
        };

        self.in_flight.insert(session.id.clone());
        self.active = Some(session);
        self.persist_active();
        Some(pending)
    }

    /// Reopen a stored session. Returns false if the id is unknown.
    pub fn resume(&mut self, id: &str) -> bool {
        let Some(stored) = history::find(&self.history, id).cloned() else {
            return false;
        };

        let chat = self.collaborator.start_chat(stored.learning_level);
        let mut session = ActiveSession::resume(&stored, chat);
        session.loading = self.in_flight.contains(id);
        self.active = Some(session);
        tracing::info!(session = %id, topic = %stored.topic, "resumed study session");
        self.persist_active();
        true
    }

    /// Record the user's side of `action` and build the request for it.
    ///
    /// Returns `None` (and changes nothing) when there is no active session,
    /// a request is already in flight, or the action has nothing to work on.
    pub fn prepare(&mut self, action: TutorAction) -> Option<PendingRequest> {
        let session = self.active.as_mut()?;
        if session.loading {
            tracing::debug!(?action, "ignoring action while loading");
            return None;
        }

        let topic = session.topic.clone();
        let level = session.level;
        let label = action
            .mode()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "MESSAGE".to_string());

        let (user_text, kind) = match action {
            TutorAction::Explain => (
                "Explain this in more detail.".to_string(),
                RequestKind::Chat {
                    chat: session.chat.clone(),
                    prompt: format!("Explain the topic of \"{topic}\" in more detail, tailored for a {level} learner. Focus on a different aspect or go deeper than your previous explanation."),
                    failure_text: ACTION_FAILED,
                },
            ),
            TutorAction::Simplify => {
                let last = session.last_ai_text()?.to_string();
                (
                    "Can you simplify that for me?".to_string(),
                    RequestKind::Chat {
                        chat: session.chat.clone(),
                        prompt: format!("Simplify the following text, which was your last response. Assume I'm a {level} learner.\n\nText: \"{last}\""),
                        failure_text: ACTION_FAILED,
                    },
                )
            }
            TutorAction::Practice => (
                "Give me a practice problem.".to_string(),
                RequestKind::Practice {
                    collaborator: self.collaborator.clone(),
                    topic,
                    level,
                },
            ),
            TutorAction::Translate { language } => {
                let language = language.trim();
                if language.is_empty() {
                    return None;
                }
                let last = session.last_ai_text()?.to_string();
                (
                    format!("Can you explain the difficult words in {language}?"),
                    RequestKind::Chat {
                        chat: session.chat.clone(),
                        prompt: format!("Please identify the difficult words or complex phrases in the following text and provide their meanings in {language}. List them clearly.\n\nText: \"{last}\""),
                        failure_text: TRANSLATE_FAILED,
                    },
                )
            }
            TutorAction::Message(text) => {
                if text.trim().is_empty() {
                    return None;
                }
                let kind = if text.trim().to_lowercase().contains(EASTER_EGG_TRIGGER) {
                    RequestKind::Canned {
                        text: EASTER_EGG_REPLY.to_string(),
                        delay: EASTER_EGG_DELAY,
                    }
                } else {
                    RequestKind::Chat {
                        chat: session.chat.clone(),
                        prompt: text.clone(),
                        failure_text: MESSAGE_FAILED,
                    }
                };
                (text, kind)
            }
        };

        let id = session.next_message_id();
        session.chat_history.push(Message::user_text(id, user_text));
        session.loading = true;
        let session_id = session.id.clone();
        self.in_flight.insert(session_id.clone());

        self.persist_active();
        Some(PendingRequest {
            session_id,
            label,
            kind,
        })
    }

    /// Append the AI's reply and clear the loading flag.
    ///
    /// If the user has moved on to another session meanwhile, the reply is
    /// still saved to the session it belongs to.
    pub fn finish(&mut self, reply: Reply) {
        let message_for = |session: &mut ActiveSession, content: ReplyContent| {
            let id = session.next_message_id();
            match content {
                ReplyContent::Text(text) => Message::ai_text(id, text),
                ReplyContent::Problem(problem) => Message::ai_problem(id, problem),
            }
        };

        self.in_flight.remove(&reply.session_id);

        match self.active.as_mut() {
            Some(session) if session.id == reply.session_id => {
                let msg = message_for(session, reply.content);
                session.chat_history.push(msg);
                session.loading = false;
                self.persist_active();
            }
            _ => {
                let Some(mut stored) = history::find(&self.history, &reply.session_id).cloned() else {
                    tracing::warn!(session = %reply.session_id, "dropping reply for unknown session");
                    return;
                };
                let next_id = stored
                    .chat_history
                    .iter()
                    .map(|m| m.id)
                    .max()
                    .map_or_else(now_millis, |last| now_millis().max(last.saturating_add(1)));
                let msg = match reply.content {
                    ReplyContent::Text(text) => Message::ai_text(next_id, text),
                    ReplyContent::Problem(problem) => Message::ai_problem(next_id, problem),
                };
                stored.chat_history.push(msg);
                stored.last_accessed = now_millis();
                self.history = self.sessions.upsert(&self.history, stored);
            }
        }
    }

    /// Prepare, run and finish `action` in one go
    pub async fn perform(&mut self, action: TutorAction) -> bool {
        let pending = self.prepare(action);
        self.complete(pending).await
    }

    /// Start a session and wait for the introduction
    pub async fn begin(&mut self, topic: &str, level: LearningLevel) -> bool {
        let pending = self.start(topic, level);
        self.complete(pending).await
    }

    async fn complete(&mut self, pending: Option<PendingRequest>) -> bool {
        match pending {
            Some(pending) => {
                let reply = pending.run().await;
                self.finish(reply);
                true
            }
            None => false,
        }
    }

    /// Flip the key-point flag on a message of the active session
    pub fn toggle_key_point(&mut self, message_id: i64) -> bool {
        let Some(session) = self.active.as_mut() else {
            return false;
        };
        let Some(msg) = session.chat_history.iter_mut().find(|m| m.id == message_id) else {
            return false;
        };
        msg.is_key_point = !msg.is_key_point;
        self.persist_active();
        true
    }

    pub fn key_points(&self) -> Vec<&Message> {
        self.active
            .as_ref()
            .map(ActiveSession::key_points)
            .unwrap_or_default()
    }

    /// Leave the current session; it stays in history
    pub fn new_topic(&mut self) {
        self.active = None;
    }

    pub fn clear_history(&mut self) {
        self.sessions.clear();
        self.history.clear();
        tracing::info!("cleared study history");
    }

    fn persist_active(&mut self) {
        if let Some(session) = self.active.as_ref() {
            let snapshot = session.to_study_session(now_millis());
            self.history = self.sessions.upsert(&self.history, snapshot);
        }
    }
}
