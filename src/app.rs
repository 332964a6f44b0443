use ratatui::layout::Rect;
use crate::poller::READY_PLACEHOLDER;
use crate::render::CLEARED_NOTICE;
use crate::sink::UiSink;
use crate::state::{ChatMessage, Readiness};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub api_url: String,

    // Transcript
    pub messages: Vec<ChatMessage>,
    pub typing: bool,
    pub scroll: u16,
    pub follow_latest: bool, // pin the view to the newest message on next render
    pub chat_height: u16,    // inner height of the transcript pane
    pub chat_width: u16,     // inner width of the transcript pane
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Query input
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub input_enabled: bool,
    pub placeholder: String,
    resume_editing: bool, // editing mode was active when input got disabled

    // Readiness gating
    pub banner: Option<String>,
    pub readiness: Option<Readiness>,

    // Panel area for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(api_url: &str) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            api_url: api_url.to_string(),

            messages: Vec::new(),
            typing: false,
            scroll: 0,
            follow_latest: true,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,

            input: String::new(),
            cursor: 0,
            input_enabled: true,
            placeholder: READY_PLACEHOLDER.to_string(),
            resume_editing: false,

            banner: None,
            readiness: None,

            chat_area: None,
        }
    }

    /// Replace the whole transcript with a single notice
    pub fn clear_transcript(&mut self) {
        self.messages.clear();
        self.append_message(ChatMessage::ai(CLEARED_NOTICE));
        self.scroll_to_latest();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.typing {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.follow_latest = false;
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half = (self.chat_height / 2).max(1);
        self.scroll = self.scroll.saturating_add(half);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half = (self.chat_height / 2).max(1);
        self.follow_latest = false;
        self.scroll = self.scroll.saturating_sub(half);
    }

    pub fn scroll_to_top(&mut self) {
        self.follow_latest = false;
        self.scroll = 0;
    }
}

impl UiSink for App {
    fn append_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    fn set_typing_visible(&mut self, visible: bool) {
        self.typing = visible;
        if !visible {
            self.animation_frame = 0;
        }
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        if enabled == self.input_enabled {
            return;
        }
        self.input_enabled = enabled;
        if enabled {
            if std::mem::take(&mut self.resume_editing) {
                self.input_mode = InputMode::Editing;
            }
        } else {
            self.resume_editing = self.input_mode == InputMode::Editing;
            self.input_mode = InputMode::Normal;
        }
    }

    fn set_input_placeholder(&mut self, text: &str) {
        self.placeholder = text.to_string();
    }

    fn show_banner(&mut self, text: &str) {
        self.banner = Some(text.to_string());
    }

    fn remove_banner(&mut self) {
        self.banner = None;
    }

    fn scroll_to_latest(&mut self) {
        self.follow_latest = true;
    }
}
