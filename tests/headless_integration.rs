use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde_json::{json, Value};

use studybuddy::ai::{ChatCollaborator, ChatSession};
use studybuddy::app::{App, AppState};
use studybuddy::error::AiError;
use studybuddy::history::SessionStore;
use studybuddy::models::{LearningLevel, Sender};
use studybuddy::preferences::Preferences;
use studybuddy::runtime::{AppEvent, FixedTicker, Runner, TestEventSource};
use studybuddy::storage::{KeyValueStore, MemoryStore};
use studybuddy::tutor::Tutor;

/// Scripted tutor that remembers every prompt it was sent
#[derive(Default)]
struct Scripted {
    prompts: Mutex<Vec<String>>,
}

struct ScriptedChat(Arc<Scripted>);

#[async_trait]
impl ChatSession for ScriptedChat {
    async fn send_message(&self, text: &str) -> Result<String, AiError> {
        self.0.prompts.lock().unwrap().push(text.to_string());
        Ok(format!("Here is an answer about: {text}"))
    }
}

struct ScriptedCollaborator(Arc<Scripted>);

#[async_trait]
impl ChatCollaborator for ScriptedCollaborator {
    fn start_chat(&self, _level: LearningLevel) -> Arc<dyn ChatSession> {
        Arc::new(ScriptedChat(self.0.clone()))
    }

    async fn generate_structured(&self, prompt: &str) -> Result<Value, AiError> {
        self.0.prompts.lock().unwrap().push(prompt.to_string());
        Ok(json!({
            "question": "What shape is Earth's orbit?",
            "options": ["Square", "Ellipse", "Triangle", "Line"],
            "correctAnswerIndex": 1,
            "explanation": "Kepler's first law."
        }))
    }
}

fn key(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn ctrl(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
}

// Drives App through Runner/TestEventSource the way the binary does, with
// each request run to completion on a tokio runtime before the next key.
#[test]
fn headless_study_flow_completes() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let scripted = Arc::new(Scripted::default());
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let tutor = Tutor::new(
        Arc::new(ScriptedCollaborator(scripted.clone())),
        SessionStore::new(store.clone()),
    );
    let mut app = App::new(
        tutor,
        Preferences::new(store.clone()),
        LearningLevel::Beginner,
        vec!["Black Holes".into()],
        None,
    );

    let runner = Runner::new(TestEventSource::new(), FixedTicker::new(Duration::from_millis(5)));
    let tx = runner.sender();

    // dismiss tutorial, pick the suggestion, raise level, start, then practice and answer
    let script = vec![
        key(KeyCode::Enter),
        key(KeyCode::Down),
        key(KeyCode::Tab),
        key(KeyCode::Tab),
        key(KeyCode::Enter),
        ctrl('p'),
        key(KeyCode::Char('2')),
        ctrl('n'),
    ];
    for event in script {
        tx.send(event).unwrap();
    }

    for _ in 0..200u32 {
        match runner.step() {
            AppEvent::Tick => {
                app.on_tick();
                if !app.is_loading() && app.state == AppState::TopicInput && !app.tutor.history().is_empty() {
                    break;
                }
            }
            AppEvent::Resize => {}
            AppEvent::Key(k) => {
                if let Some(pending) = app.on_key(k) {
                    // answer before the next scripted key is processed
                    let reply = rt.block_on(pending.run());
                    app.on_reply(reply);
                }
            }
            AppEvent::Reply(reply) => app.on_reply(reply),
        }
    }

    assert!(Preferences::new(store.clone()).tutorial_seen());
    assert_eq!(app.state, AppState::TopicInput);

    let history = SessionStore::new(store).get_all();
    assert_eq!(history.len(), 1);
    let session = &history[0];
    assert_eq!(session.topic, "Black Holes");
    assert_eq!(session.learning_level, LearningLevel::Advanced);

    let senders: Vec<Sender> = session.chat_history.iter().map(|m| m.sender).collect();
    assert_eq!(senders, vec![Sender::User, Sender::Ai, Sender::User, Sender::Ai]);
    assert!(session.chat_history[3].practice_problem.is_some());

    let prompts = scripted.prompts.lock().unwrap();
    assert_eq!(prompts[0], "Explain the basics of \"Black Holes\". I am a advanced learner.");
    assert!(prompts[1].contains("for a advanced learner"));
}

#[test]
fn ticks_only_animate_while_loading() {
    let scripted = Arc::new(Scripted::default());
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let tutor = Tutor::new(Arc::new(ScriptedCollaborator(scripted)), SessionStore::new(store.clone()));
    let mut app = App::new(tutor, Preferences::new(store), LearningLevel::Basic, vec![], None);

    app.on_tick();
    assert_eq!(app.spinner, 0);

    let pending = app.start_topic("Volcanoes");
    assert!(pending.is_some());
    app.on_tick();
    app.on_tick();
    assert_eq!(app.spinner, 2);
}
