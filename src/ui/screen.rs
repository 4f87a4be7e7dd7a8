use ratatui::Frame;

use studybuddy::app::{App, AppState};

use super::{render_chat, render_topic_input, Palette};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, palette: &Palette, f: &mut Frame);
}

/// Topic entry with level picker and today's suggestions
pub struct TopicScreen;

impl Screen for TopicScreen {
    fn render(&self, app: &App, palette: &Palette, f: &mut Frame) {
        render_topic_input(app, palette, f);
    }
}

/// Conversation with the tutor
pub struct ChatScreen;

impl Screen for ChatScreen {
    fn render(&self, app: &App, palette: &Palette, f: &mut Frame) {
        render_chat(app, palette, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: AppState) -> Box<dyn Screen> {
    match state {
        AppState::TopicInput => Box::new(TopicScreen),
        AppState::Chat => Box::new(ChatScreen),
    }
}
