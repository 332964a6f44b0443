use crate::state::ChatMessage;

/// UI operations the pipeline and the poller are allowed to perform.
///
/// `App` implements this for the terminal; tests use a recording sink.
pub trait UiSink {
    fn append_message(&mut self, message: ChatMessage);

    fn clear_input(&mut self);

    fn set_typing_visible(&mut self, visible: bool);

    fn set_input_enabled(&mut self, enabled: bool);

    fn set_input_placeholder(&mut self, text: &str);

    /// Idempotent: showing a banner replaces any banner already shown
    fn show_banner(&mut self, text: &str);

    fn remove_banner(&mut self);

    fn scroll_to_latest(&mut self);
}
