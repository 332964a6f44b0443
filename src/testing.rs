//! Test doubles shared by the pipeline, poller and handler tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::{ApiError, Backend, HealthResponse, LlmHealth, QueryResponse};
use crate::sink::UiSink;
use crate::state::ChatMessage;

pub fn answer(text: &str) -> QueryResponse {
    QueryResponse {
        answer: text.to_string(),
        ..Default::default()
    }
}

pub fn health(status: &str, model: Option<&str>) -> HealthResponse {
    HealthResponse {
        llm: Some(LlmHealth {
            status: Some(status.to_string()),
            model: model.map(str::to_string),
        }),
    }
}

type Reply<T> = (Duration, Result<T, ApiError>);

#[derive(Default)]
struct Script {
    queries: VecDeque<Reply<QueryResponse>>,
    keyed: HashMap<String, VecDeque<Reply<QueryResponse>>>,
    health: VecDeque<Result<HealthResponse, ApiError>>,
    health_fallback_fails: bool,
    received: Vec<String>,
    health_calls: usize,
}

/// Backend that replays scripted results. Cloning shares the script.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(self, result: Result<QueryResponse, ApiError>) -> Self {
        self.script.lock().unwrap().queries.push_back((Duration::ZERO, result));
        self
    }

    pub fn with_reply_to(
        self,
        query: &str,
        delay: Duration,
        result: Result<QueryResponse, ApiError>,
    ) -> Self {
        self.script
            .lock()
            .unwrap()
            .keyed
            .entry(query.to_string())
            .or_default()
            .push_back((delay, result));
        self
    }

    pub fn with_health(self, result: Result<HealthResponse, ApiError>) -> Self {
        self.script.lock().unwrap().health.push_back(result);
        self
    }

    /// Once the scripted health results run out, keep failing
    pub fn failing_health(self) -> Self {
        self.script.lock().unwrap().health_fallback_fails = true;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.script.lock().unwrap().received.clone()
    }

    pub fn query_count(&self) -> usize {
        self.script.lock().unwrap().received.len()
    }

    pub fn health_calls(&self) -> usize {
        self.script.lock().unwrap().health_calls
    }
}

impl Backend for ScriptedBackend {
    async fn query(&self, query: &str) -> Result<QueryResponse, ApiError> {
        let (delay, result) = {
            let mut script = self.script.lock().unwrap();
            script.received.push(query.to_string());
            let keyed = script.keyed.get_mut(query).and_then(|q| q.pop_front());
            keyed
                .or_else(|| script.queries.pop_front())
                .unwrap_or_else(|| (Duration::ZERO, Err(ApiError::protocol("/query", "no scripted reply"))))
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let result = {
            let mut script = self.script.lock().unwrap();
            script.health_calls += 1;
            match script.health.pop_front() {
                Some(result) => result,
                None if script.health_fallback_fails => Err(ApiError::protocol("/health", "status 503")),
                None => Ok(health("ready", None)),
            }
        };
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCall {
    Append(ChatMessage),
    ClearInput,
    Typing(bool),
    InputEnabled(bool),
    Placeholder(String),
    ShowBanner(String),
    RemoveBanner,
    ScrollToLatest,
}

/// Sink that records every call and tracks the resulting state
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<UiCall>,
    pub typing: bool,
    pub input_enabled: Option<bool>,
    pub banner: Option<String>,
}

impl RecordingSink {
    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                UiCall::Append(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Calls that touch input gating or the banner
    pub fn gating_calls(&self) -> Vec<UiCall> {
        self.calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    UiCall::InputEnabled(_)
                        | UiCall::Placeholder(_)
                        | UiCall::ShowBanner(_)
                        | UiCall::RemoveBanner
                )
            })
            .cloned()
            .collect()
    }
}

impl UiSink for RecordingSink {
    fn append_message(&mut self, message: ChatMessage) {
        self.calls.push(UiCall::Append(message));
    }

    fn clear_input(&mut self) {
        self.calls.push(UiCall::ClearInput);
    }

    fn set_typing_visible(&mut self, visible: bool) {
        self.typing = visible;
        self.calls.push(UiCall::Typing(visible));
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = Some(enabled);
        self.calls.push(UiCall::InputEnabled(enabled));
    }

    fn set_input_placeholder(&mut self, text: &str) {
        self.calls.push(UiCall::Placeholder(text.to_string()));
    }

    fn show_banner(&mut self, text: &str) {
        self.banner = Some(text.to_string());
        self.calls.push(UiCall::ShowBanner(text.to_string()));
    }

    fn remove_banner(&mut self) {
        self.banner = None;
        self.calls.push(UiCall::RemoveBanner);
    }

    fn scroll_to_latest(&mut self) {
        self.calls.push(UiCall::ScrollToLatest);
    }
}
