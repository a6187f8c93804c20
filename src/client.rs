use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use tokio_util::sync::CancellationToken;

use crate::{
    refiner::{require_text, TextRefiner},
    wire::{ChatCompletionRequest, ChatCompletionResponse},
    ApiCredentials, RefineConfig, RefineError, Result, RetryExecutor, RetryPolicy, SystemPrompt,
};

/// Per-attempt budget for a single chat-completion call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

#[derive(Clone)]
/// Refines text through an OpenAI-compatible chat-completion endpoint.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    api_url: String,
    authorization: String,
    model: String,
    prompt: SystemPrompt,
    executor: RetryExecutor,
    request_timeout: Duration,
}

impl fmt::Debug for ChatCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionClient")
            .field("api_url", &self.api_url)
            .field("authorization", &"<redacted>")
            .field("model", &self.model)
            .field("retry_policy", self.executor.policy())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ChatCompletionClient {
    /// Creates a client from an endpoint URL and an API key.
    ///
    /// If the key is missing the `Bearer ` prefix, it is added automatically.
    /// Both values must be non-blank.
    pub fn new(api_url: impl Into<String>, api_key: impl AsRef<str>) -> Result<Self> {
        let api_url = api_url.into();
        if api_url.trim().is_empty() {
            return Err(RefineError::Config("AI API URL must be configured".to_owned()));
        }
        if api_key.as_ref().trim().is_empty() {
            return Err(RefineError::Config("AI API key must be configured".to_owned()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_url,
            authorization: normalize_bearer_authorization(api_key.as_ref()),
            model: DEFAULT_MODEL.to_owned(),
            prompt: SystemPrompt::default(),
            executor: RetryExecutor::default(),
            request_timeout: REQUEST_TIMEOUT,
        })
    }

    /// Creates a client from loaded configuration and its credentials.
    pub fn from_config(config: &RefineConfig, credentials: &ApiCredentials) -> Result<Self> {
        Ok(Self::new(&credentials.api_url, &credentials.api_key)?
            .with_model(&config.model)
            .with_system_prompt(config.system_prompt.clone())
            .with_retry_policy(config.retry.clone()))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: SystemPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.executor = RetryExecutor::new(policy);
        self
    }

    /// Aborts pending backoff sleeps when `cancel` fires.
    ///
    /// Call after [`ChatCompletionClient::with_retry_policy`]; replacing the
    /// policy drops the token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.executor = self.executor.with_cancellation(cancel);
        self
    }

    /// Overrides the per-attempt timeout (defaults to [`REQUEST_TIMEOUT`]).
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Issues one POST and returns the raw body of a 2xx response.
    async fn send_once(&self, body: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.api_url)
            .header(header::AUTHORIZATION, &self.authorization)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.request_timeout)
            .body(body.to_owned())
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.transport_error(err))?;

        if !status.is_success() {
            tracing::debug!("AI API answered {status}: {body}");
            return Err(RefineError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn transport_error(&self, err: reqwest::Error) -> RefineError {
        if err.is_timeout() {
            RefineError::Timeout {
                after: self.request_timeout,
            }
        } else {
            RefineError::Transport(err)
        }
    }
}

#[async_trait]
impl TextRefiner for ChatCompletionClient {
    fn name(&self) -> &'static str {
        "chat-completion"
    }

    async fn refine_text(&self, input: &str) -> Result<String> {
        let text = require_text(input)?;
        tracing::debug!("calling AI API to refine text, model: {}", self.model);

        let request = ChatCompletionRequest::refinement(&self.model, self.prompt.as_str(), text);
        let body = serde_json::to_string(&request).map_err(|err| {
            tracing::error!("failed to serialize chat-completion request: {err}");
            RefineError::Serialization(err)
        })?;

        let raw = match self.executor.execute(|| self.send_once(&body)).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!("failed to call AI API: {err}");
                return Err(err);
            }
        };

        // Validation happens after the retry boundary: a malformed 2xx
        // response is terminal and never resubmitted.
        let response = serde_json::from_str::<ChatCompletionResponse>(&raw).map_err(|err| {
            RefineError::Decode(format!(
                "invalid chat-completion response JSON: {err}; body: {raw}"
            ))
        })?;
        if response.choices.is_empty() {
            return Err(RefineError::EmptyResponse("no choices returned".to_owned()));
        }
        let content = response
            .first_content()
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| RefineError::EmptyResponse("first choice has no content".to_owned()))?;

        tracing::debug!("successfully refined text");
        Ok(content.to_owned())
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
