use ratatui::Frame;

use crate::{
    ui::{history::render_history, render_setup},
    App, AppState,
};

/// A UI Screen boundary: one per app state
pub trait Screen {
    fn render(&mut self, app: &mut App, f: &mut Frame);
}

/// Preset selection before a session starts
pub struct SetupScreen;

impl Screen for SetupScreen {
    fn render(&mut self, app: &mut App, f: &mut Frame) {
        render_setup(app, f);
    }
}

/// Session screens share the App widget, which switches on the phase
pub struct SessionScreen;

impl Screen for SessionScreen {
    fn render(&mut self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&mut self, app: &mut App, f: &mut Frame) {
        render_history(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Setup => Box::new(SetupScreen),
        AppState::Training | AppState::Resting | AppState::Complete => Box::new(SessionScreen),
        AppState::History => Box::new(HistoryScreen),
    }
}
