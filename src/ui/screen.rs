use ratatui::Frame;

use crate::{App, AppState};

/// A UI Screen boundary: responsible for rendering the current app state
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Breathing screen - circle, phase, score and controls
pub struct SessionScreen;

impl Screen for SessionScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        let area = f.area();
        app.render_session(area, f.buffer_mut());
    }
}

/// End of session summary
pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        let area = f.area();
        app.render_results(area, f.buffer_mut());
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Session => Box::new(SessionScreen),
        AppState::Results => Box::new(ResultsScreen),
    }
}
