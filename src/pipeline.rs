//! Query submission and reply rendering.
//!
//! `submit` runs on the UI loop and spawns the POST; the spawned task sends
//! `AppEvent::QueryFinished` back, and the loop hands it to `complete`.
//! Every accepted submission ends in exactly one AI transcript entry.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ApiError, Backend, QueryResponse};
use crate::render;
use crate::sink::UiSink;
use crate::state::ChatMessage;
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionId(pub u64);

pub struct MessagePipeline<B> {
    backend: Arc<B>,
    events: mpsc::UnboundedSender<AppEvent>,
    next_id: u64,
}

impl<B: Backend> MessagePipeline<B> {
    pub fn new(backend: Arc<B>, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            backend,
            events,
            next_id: 0,
        }
    }

    /// Returns `None` without touching the UI when the input is blank.
    pub fn submit<S: UiSink>(&mut self, raw_input: &str, ui: &mut S) -> Option<SubmissionId> {
        let query = raw_input.trim();
        if query.is_empty() {
            return None;
        }

        ui.append_message(ChatMessage::user(query));
        ui.scroll_to_latest();
        ui.clear_input();
        ui.set_typing_visible(true);

        let id = SubmissionId(self.next_id);
        self.next_id += 1;
        debug!(id = id.0, "submitting query");

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        let query = query.to_string();
        tokio::spawn(async move {
            let result = backend.query(&query).await;
            // A closed channel means the UI loop is gone; nothing left to render into
            let _ = events.send(AppEvent::QueryFinished { id, result });
        });

        Some(id)
    }

    pub fn complete<S: UiSink>(
        &mut self,
        id: SubmissionId,
        result: Result<QueryResponse, ApiError>,
        ui: &mut S,
    ) {
        ui.set_typing_visible(false);

        let message = match result {
            Ok(response) => {
                debug!(id = id.0, intent = ?response.intent, "query answered");
                ChatMessage::ai(render::format_reply(&response))
            }
            Err(err) => {
                warn!(id = id.0, network = err.is_network(), error = %err, "query failed");
                ChatMessage::error(render::ERROR_NOTICE)
            }
        };

        ui.append_message(message);
        ui.scroll_to_latest();
    }
}
