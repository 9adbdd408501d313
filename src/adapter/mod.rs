//! The provider adapter: plan a request from a descriptor and an endpoint
//! config, dispatch it once, extract the reply text from the JSON response.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::history::Slot;
use crate::providers::ProviderDescriptor;

// ── Endpoint configuration ──────────────────────────────────────────────

/// Outbound HTTP method for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => anyhow::bail!("unknown HTTP method '{other}'"),
        }
    }
}

fn default_provider_id() -> String {
    "gemini".to_string()
}

fn default_method() -> HttpMethod {
    HttpMethod::Post
}

fn default_content_type() -> String {
    "application/json".to_string()
}

/// User-editable settings for one pane. Persisted whole, replacing any prior
/// value for its slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
    /// Provider descriptor id this endpoint speaks, e.g. `gemini`.
    #[serde(default = "default_provider_id")]
    pub provider: String,
    #[serde(default = "default_method")]
    pub method: HttpMethod,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl EndpointConfig {
    /// Starting configuration for a slot before the user edits anything.
    pub fn default_for(slot: Slot) -> Self {
        Self {
            label: slot.default_label().to_string(),
            url: "https://api.example.com/v1/endpoint".to_string(),
            provider: default_provider_id(),
            method: default_method(),
            content_type: default_content_type(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
        }
    }
}

// ── Request planning ────────────────────────────────────────────────────

/// A fully specified outbound request. Building one performs no validation
/// and no network action; a bad URL fails later, in the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPlan {
    pub url: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    /// `None` for GET, regardless of template content.
    pub body: Option<Value>,
}

/// Plan the request for `message` against one endpoint.
pub fn build_request(
    descriptor: &ProviderDescriptor,
    config: &EndpointConfig,
    message: &str,
) -> RequestPlan {
    let mut url = config.url.clone();
    if !config.params.is_empty() {
        let query = config
            .params
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&query);
    }

    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), config.content_type.clone());
    for (key, value) in &config.headers {
        headers.insert(key.clone(), value.clone());
    }

    let body = if config.method == HttpMethod::Get {
        None
    } else {
        Some(descriptor.request_template.render(message))
    };

    RequestPlan {
        url,
        method: config.method,
        headers,
        body,
    }
}

// ── Dispatch ────────────────────────────────────────────────────────────

/// What a send can fail with. Every kind is rendered into the affected pane
/// and never retried.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no endpoint configured for the {0} slot")]
    ConfigMissing(Slot),
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("request failed: {status} {status_text} - {body}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("{0}")]
    Extraction(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// A successfully parsed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// HTTP transport, implemented by anything that can carry a planned request.
///
/// The real implementation is [`HttpTransport`]; tests substitute scripted
/// responses. Exactly one attempt per call: no retry, no backoff.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the plan and return the parsed response.
    ///
    /// # Errors
    ///
    /// `Http` on a non-2xx status (carrying the body text), `InvalidJson`
    /// when a 2xx body fails to parse, `Transport` for connection-level
    /// failures.
    async fn execute(&self, plan: &RequestPlan) -> Result<RawResponse, SendError>;
}

/// Reqwest-backed transport with the configured timeouts.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(request_timeout)
                .connect_timeout(connect_timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, plan: &RequestPlan) -> Result<RawResponse, SendError> {
        tracing::debug!(url = %plan.url, method = %plan.method, "dispatching request");

        let mut request = self.client.request(plan.method.as_reqwest(), &plan.url);
        for (key, value) in &plan.headers {
            request = request.header(key, value);
        }
        // The plan already drops the body for GET; this guard keeps the wire
        // honest even for hand-built plans.
        if plan.method != HttpMethod::Get {
            if let Some(body) = &plan.body {
                request = request.json(body);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let mut headers = BTreeMap::new();
        for (key, value) in response.headers() {
            headers.insert(
                key.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(SendError::Http {
                status: status.as_u16(),
                status_text,
                body: text,
            });
        }

        let body: Value =
            serde_json::from_str(&text).map_err(|e| SendError::InvalidJson(e.to_string()))?;
        Ok(RawResponse {
            status: status.as_u16(),
            status_text,
            headers,
            body,
        })
    }
}

// ── Reply extraction ────────────────────────────────────────────────────

/// Pull the reply text out of a success body.
///
/// Resolves the descriptor's reply path, then renders the value as text:
/// non-empty strings pass through, non-zero numbers and `true` are
/// stringified, everything falsy and any array or object fails. On failure
/// the error path is consulted for the provider's own message; otherwise a
/// generic description of what went wrong is returned.
pub fn extract_reply(descriptor: &ProviderDescriptor, body: &Value) -> Result<String, SendError> {
    let cause = match descriptor.reply_path.resolve(body) {
        Ok(value) => match scalar_text(value) {
            Ok(text) => return Ok(text),
            Err(cause) => cause,
        },
        Err(err) => err.to_string(),
    };

    let message = provider_error_text(descriptor, body)
        .unwrap_or_else(|| format!("could not extract reply text ({cause})"));
    Err(SendError::Extraction(message))
}

fn provider_error_text(descriptor: &ProviderDescriptor, body: &Value) -> Option<String> {
    let value = descriptor.error_path.resolve(body).ok()?;
    scalar_text(value).ok()
}

/// Render a scalar as reply text. `Err` carries a description of why the
/// value is unusable.
fn scalar_text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::String(_) => Err("reply text is empty".to_string()),
        Value::Number(n) => {
            if n.as_f64() == Some(0.0) {
                Err("reply value is zero".to_string())
            } else {
                Ok(n.to_string())
            }
        }
        Value::Bool(true) => Ok("true".to_string()),
        Value::Bool(false) => Err("reply value is false".to_string()),
        Value::Null => Err("reply value is null".to_string()),
        Value::Array(_) => Err("reply path resolved to an array, not text".to_string()),
        Value::Object(_) => Err("reply path resolved to an object, not text".to_string()),
    }
}
