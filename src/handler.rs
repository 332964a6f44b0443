use std::sync::Arc;
use std::time::Duration;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tracing::debug;
use crate::api::Backend;
use crate::app::{App, InputMode};
use crate::pipeline::MessagePipeline;
use crate::poller::ReadinessPoller;
use crate::tui::AppEvent;

/// The two background-work owners, kept next to (not inside) `App` so they
/// can take `&mut App` as their UI sink.
pub struct Controller<B> {
    pub pipeline: MessagePipeline<B>,
    pub poller: ReadinessPoller<B>,
}

impl<B: Backend> Controller<B> {
    pub fn new(backend: Arc<B>, events: mpsc::UnboundedSender<AppEvent>, poll_interval: Duration) -> Self {
        Self {
            pipeline: MessagePipeline::new(Arc::clone(&backend), events.clone()),
            poller: ReadinessPoller::new(backend, events, poll_interval),
        }
    }

    pub fn shutdown(&mut self) {
        if !self.poller.is_stopped() {
            debug!("stopping readiness poller");
            self.poller.shutdown();
        }
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event<B: Backend>(app: &mut App, controller: &mut Controller<B>, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, controller, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::QueryFinished { id, result } => {
            controller.pipeline.complete(id, result, app);
        }
        AppEvent::PollDue(cycle) => {
            controller.poller.on_due(cycle);
        }
        AppEvent::HealthChecked { cycle, result } => {
            if let Some(readiness) = controller.poller.on_health(cycle, result, app) {
                app.readiness = Some(readiness);
            }
        }
    }
}

fn handle_key<B: Backend>(app: &mut App, controller: &mut Controller<B>, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('l') => {
                app.clear_transcript();
                return;
            }
            _ => {}
        }
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, controller, key),
        InputMode::Editing => handle_editing_mode(app, controller, key),
    }
}

fn handle_normal_mode<B: Backend>(app: &mut App, controller: &mut Controller<B>, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Start typing, unless the backend is still loading
        KeyCode::Char('i') | KeyCode::Char('a') | KeyCode::Enter => {
            if app.input_enabled {
                app.input_mode = InputMode::Editing;
            }
        }

        // Transcript scrolling
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.follow_latest = true,

        // Re-check readiness now instead of waiting for the next cycle
        KeyCode::Char('r') => {
            controller.poller.trigger();
        }

        _ => {}
    }
}

fn handle_editing_mode<B: Backend>(app: &mut App, controller: &mut Controller<B>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            if app.input_enabled {
                let query = app.input.clone();
                controller.pipeline.submit(&query, app);
            }
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            if app.input_enabled {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.insert(byte_pos, c);
                app.cursor += 1;
            }
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            for _ in 0..3 {
                app.scroll_down();
            }
        }
        MouseEventKind::ScrollUp => {
            for _ in 0..3 {
                app.scroll_up();
            }
        }
        _ => {}
    }
}
