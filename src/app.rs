//! Terminal-independent application state and key handling.
//!
//! The binary owns the terminal and the async runtime; everything it draws
//! or dispatches comes from [`App`], so the whole interaction can be driven
//! headlessly in tests.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::history;
use crate::models::{LearningLevel, Message, Sender, StudySession};
use crate::preferences::{Preferences, Theme};
use crate::tutor::{PendingRequest, Reply, Tutor, TutorAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    TopicInput,
    Chat,
}

/// Modal panels drawn over the current screen; they take all keys while open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    History { selected: usize },
    Language { input: String },
    KeyPoints,
    Tutorial,
    Tip,
}

pub struct App {
    pub tutor: Tutor,
    pub prefs: Preferences,
    pub state: AppState,
    pub overlay: Option<Overlay>,
    pub theme: Theme,
    pub level: LearningLevel,
    pub topic_input: String,
    pub suggested_topics: Vec<String>,
    pub suggestion_cursor: Option<usize>,
    pub tip: Option<String>,
    pub chat_input: String,
    /// Index into the active chat log, for flagging key points and answering
    pub selected_message: Option<usize>,
    /// Chosen option per practice-problem message id; not persisted
    pub answers: HashMap<i64, usize>,
    pub spinner: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        tutor: Tutor,
        prefs: Preferences,
        level: LearningLevel,
        suggested_topics: Vec<String>,
        tip: Option<String>,
    ) -> Self {
        let overlay = (!prefs.tutorial_seen()).then_some(Overlay::Tutorial);
        Self {
            theme: prefs.theme(),
            tutor,
            prefs,
            state: AppState::TopicInput,
            overlay,
            level,
            topic_input: String::new(),
            suggested_topics,
            suggestion_cursor: None,
            tip,
            chat_input: String::new(),
            selected_message: None,
            answers: HashMap::new(),
            spinner: 0,
            should_quit: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.tutor.is_loading()
    }

    pub fn messages(&self) -> &[Message] {
        self.tutor
            .active()
            .map(|s| s.chat_history.as_slice())
            .unwrap_or_default()
    }

    pub fn sorted_history(&self) -> Vec<&StudySession> {
        history::sorted_by_recent(self.tutor.history())
    }

    /// Start a session on `topic` straight away (used by `study --topic`)
    pub fn start_topic(&mut self, topic: &str) -> Option<PendingRequest> {
        let pending = self.tutor.start(topic, self.level)?;
        self.enter_chat();
        Some(pending)
    }

    pub fn on_tick(&mut self) {
        if self.is_loading() {
            self.spinner = self.spinner.wrapping_add(1);
        }
    }

    pub fn on_reply(&mut self, reply: Reply) {
        self.tutor.finish(reply);
    }

    /// Handle one key press. A returned request must be run and its reply
    /// fed back through [`App::on_reply`].
    pub fn on_key(&mut self, key: KeyEvent) -> Option<PendingRequest> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return None;
        }

        if let Some(overlay) = self.overlay.take() {
            return self.on_overlay_key(overlay, key);
        }

        if ctrl {
            if let KeyCode::Char(c) = key.code {
                return self.on_ctrl(c);
            }
        }

        match self.state {
            AppState::TopicInput => self.on_topic_key(key),
            AppState::Chat => self.on_chat_key(key),
        }
    }

    fn on_ctrl(&mut self, c: char) -> Option<PendingRequest> {
        match (c, self.state) {
            ('t', _) => {
                self.theme = self.prefs.toggle_theme();
                None
            }
            ('r', _) => {
                if !self.is_loading() {
                    self.overlay = Some(Overlay::History { selected: 0 });
                }
                None
            }
            ('b', _) => {
                self.overlay = Some(Overlay::Tip);
                None
            }
            ('g', _) => {
                self.overlay = Some(Overlay::Tutorial);
                None
            }
            ('e', AppState::Chat) => self.tutor.prepare(TutorAction::Explain),
            ('s', AppState::Chat) => self.tutor.prepare(TutorAction::Simplify),
            ('p', AppState::Chat) => self.tutor.prepare(TutorAction::Practice),
            ('l', AppState::Chat) => {
                let has_text = self.tutor.active().and_then(|s| s.last_ai_text()).is_some();
                if has_text && !self.is_loading() {
                    self.overlay = Some(Overlay::Language {
                        input: String::new(),
                    });
                }
                None
            }
            ('k', AppState::Chat) => {
                self.overlay = Some(Overlay::KeyPoints);
                None
            }
            ('f', AppState::Chat) => {
                self.toggle_selected_key_point();
                None
            }
            ('n', AppState::Chat) => {
                self.leave_chat();
                None
            }
            _ => None,
        }
    }

    fn on_overlay_key(&mut self, overlay: Overlay, key: KeyEvent) -> Option<PendingRequest> {
        match overlay {
            Overlay::History { selected } => {
                let len = self.tutor.history().len();
                match key.code {
                    KeyCode::Esc => {}
                    KeyCode::Up => {
                        self.overlay = Some(Overlay::History {
                            selected: selected.saturating_sub(1),
                        });
                    }
                    KeyCode::Down => {
                        self.overlay = Some(Overlay::History {
                            selected: (selected + 1).min(len.saturating_sub(1)),
                        });
                    }
                    KeyCode::Enter => {
                        let id = self.sorted_history().get(selected).map(|s| s.id.clone());
                        let resumed = id.is_some_and(|id| self.tutor.resume(&id));
                        if resumed {
                            self.enter_chat();
                        } else {
                            self.overlay = Some(Overlay::History { selected });
                        }
                    }
                    KeyCode::Char('c') => self.tutor.clear_history(),
                    _ => self.overlay = Some(Overlay::History { selected }),
                }
                None
            }
            Overlay::Language { mut input } => match key.code {
                KeyCode::Esc => None,
                KeyCode::Enter if !input.trim().is_empty() => {
                    self.tutor.prepare(TutorAction::Translate { language: input })
                }
                KeyCode::Backspace => {
                    input.pop();
                    self.overlay = Some(Overlay::Language { input });
                    None
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    self.overlay = Some(Overlay::Language { input });
                    None
                }
                _ => {
                    self.overlay = Some(Overlay::Language { input });
                    None
                }
            },
            Overlay::Tutorial => {
                match key.code {
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ') => {
                        self.prefs.mark_tutorial_seen();
                    }
                    _ => self.overlay = Some(Overlay::Tutorial),
                }
                None
            }
            Overlay::KeyPoints => {
                if !matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                    self.overlay = Some(Overlay::KeyPoints);
                }
                None
            }
            // any key
            Overlay::Tip => None,
        }
    }

    fn on_topic_key(&mut self, key: KeyEvent) -> Option<PendingRequest> {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.level = self.level.next(),
            KeyCode::Up | KeyCode::Down if !self.suggested_topics.is_empty() => {
                let len = self.suggested_topics.len();
                let idx = match (self.suggestion_cursor, key.code) {
                    (None, KeyCode::Down) => 0,
                    (None, _) => len - 1,
                    (Some(i), KeyCode::Down) => (i + 1) % len,
                    (Some(i), _) => (i + len - 1) % len,
                };
                self.suggestion_cursor = Some(idx);
                self.topic_input = self.suggested_topics[idx].clone();
            }
            KeyCode::Enter => {
                let topic = self.topic_input.clone();
                return self.start_topic(&topic);
            }
            KeyCode::Backspace => {
                self.topic_input.pop();
                self.suggestion_cursor = None;
            }
            KeyCode::Char(c) => {
                self.topic_input.push(c);
                self.suggestion_cursor = None;
            }
            _ => {}
        }
        None
    }

    fn on_chat_key(&mut self, key: KeyEvent) -> Option<PendingRequest> {
        match key.code {
            KeyCode::Esc => {
                if self.selected_message.take().is_none() {
                    self.leave_chat();
                }
            }
            KeyCode::Up => {
                let len = self.messages().len();
                self.selected_message = match self.selected_message {
                    _ if len == 0 => None,
                    None => Some(len - 1),
                    Some(i) => Some(i.saturating_sub(1)),
                };
            }
            KeyCode::Down => {
                let len = self.messages().len();
                self.selected_message = self.selected_message.and_then(|i| (i + 1 < len).then_some(i + 1));
            }
            KeyCode::Enter => {
                if self.chat_input.trim().is_empty() {
                    return None;
                }
                let text = std::mem::take(&mut self.chat_input);
                let pending = self.tutor.prepare(TutorAction::Message(text.clone()));
                if pending.is_none() {
                    // not accepted (e.g. still loading); keep what was typed
                    self.chat_input = text;
                }
                return pending;
            }
            KeyCode::Char(c @ '1'..='4') if self.chat_input.is_empty() => {
                let option = c as usize - '1' as usize;
                if !self.answer_problem(option) {
                    self.chat_input.push(c);
                }
            }
            KeyCode::Backspace => {
                self.chat_input.pop();
            }
            KeyCode::Char(c) => self.chat_input.push(c),
            _ => {}
        }
        None
    }

    /// The practice problem number keys apply to: the selected message if it
    /// is one, otherwise the newest unanswered problem.
    pub fn answer_target(&self) -> Option<&Message> {
        let messages = self.messages();
        if let Some(msg) = self.selected_message.and_then(|i| messages.get(i)) {
            if msg.practice_problem.is_some() {
                return Some(msg);
            }
        }
        messages
            .iter()
            .rev()
            .find(|m| m.practice_problem.is_some() && !self.answers.contains_key(&m.id))
    }

    fn answer_problem(&mut self, option: usize) -> bool {
        let Some(target) = self.answer_target() else {
            return false;
        };
        let id = target.id;
        let answerable = target
            .practice_problem
            .as_ref()
            .is_some_and(|p| !p.is_error() && option < p.options.len());
        if !answerable || self.answers.contains_key(&id) {
            return false;
        }
        self.answers.insert(id, option);
        true
    }

    fn toggle_selected_key_point(&mut self) {
        let Some(msg) = self.selected_message.and_then(|i| self.messages().get(i)) else {
            return;
        };
        if msg.sender == Sender::Ai {
            let id = msg.id;
            self.tutor.toggle_key_point(id);
        }
    }

    fn enter_chat(&mut self) {
        self.state = AppState::Chat;
        self.topic_input.clear();
        self.suggestion_cursor = None;
        self.chat_input.clear();
        self.selected_message = None;
    }

    fn leave_chat(&mut self) {
        self.tutor.new_topic();
        self.state = AppState::TopicInput;
        self.chat_input.clear();
        self.selected_message = None;
    }
}
