use std::future::Future;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::state::Readiness;

const QUERY_PATH: &str = "/query";
const HEALTH_PATH: &str = "/health";

/// Failures talking to the Pilot API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or no complete response came back
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A response arrived but is not the expected shape
    #[error("bad response from {endpoint}: {message}")]
    Protocol {
        endpoint: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn protocol(endpoint: &'static str, message: impl Into<String>) -> Self {
        ApiError::Protocol {
            endpoint,
            message: message.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HealthResponse {
    #[serde(default, deserialize_with = "lenient_llm")]
    pub llm: Option<LlmHealth>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmHealth {
    pub status: Option<String>,
    pub model: Option<String>,
}

/// The `llm` section is read loosely: a field of an unexpected type, or a
/// section that is not an object, must not turn a healthy reply into a
/// parse failure.
fn lenient_llm<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<LlmHealth>, D::Error> {
    let Value::Object(fields) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    let status = fields.get("status").and_then(Value::as_str).map(str::to_string);
    let model = match fields.get("model") {
        None | Some(Value::Null) => None,
        Some(Value::String(model)) => Some(model.clone()),
        Some(other) => Some(other.to_string()),
    };
    Ok(Some(LlmHealth { status, model }))
}

impl HealthResponse {
    /// Only an explicit "downloading" status gates input; anything else,
    /// including a missing `llm` section, counts as ready.
    pub fn readiness(&self) -> Readiness {
        match &self.llm {
            Some(llm) if llm.status.as_deref() == Some("downloading") => Readiness::Downloading {
                model: llm.model.clone().unwrap_or_else(|| "unknown model".to_string()),
            },
            _ => Readiness::Ready,
        }
    }
}

/// The two calls the chat client makes against the Pilot API.
pub trait Backend: Send + Sync + 'static {
    fn query(&self, query: &str) -> impl Future<Output = Result<QueryResponse, ApiError>> + Send;

    fn health(&self) -> impl Future<Output = Result<HealthResponse, ApiError>> + Send;
}

#[derive(Clone)]
pub struct PilotClient {
    client: Client,
    base_url: String,
}

impl PilotClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: &'static str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::protocol(endpoint, format!("status {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Network { endpoint, source })?;

        serde_json::from_slice(&body).map_err(|e| ApiError::protocol(endpoint, e.to_string()))
    }
}

impl Backend for PilotClient {
    async fn query(&self, query: &str) -> Result<QueryResponse, ApiError> {
        let url = format!("{}{}", self.base_url, QUERY_PATH);

        let response = self
            .client
            .post(&url)
            .json(&QueryRequest { query })
            .send()
            .await
            .map_err(|source| ApiError::Network {
                endpoint: QUERY_PATH,
                source,
            })?;

        Self::read_json(QUERY_PATH, response).await
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Network {
                endpoint: HEALTH_PATH,
                source,
            })?;

        Self::read_json(HEALTH_PATH, response).await
    }
}
