use std::time::Duration;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use log::{debug, log_enabled, warn, Level};

use crate::utils::llm::{BackendError, BackendFailure, GenerateText, GenerationConfig};
use crate::utils::token::tiktoken::Tiktoken;
use crate::utils::token::CountToken;

/// A text generator backed by the OpenAI chat-completions API.
///
/// Every prompt is sent as a single user message.
pub struct OpenAIBackend {
    client: Client<OpenAIConfig>,
    deadline: Option<Duration>,
}

/// A builder for [OpenAIBackend].
#[derive(Debug, Default)]
pub struct OpenAIBackendBuilder {
    config: OpenAIConfig,
    deadline: Option<Duration>,
}

impl OpenAIBackendBuilder {
    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config = self.config.with_api_key(api_key);
        self
    }

    /// Set the base URL of the API.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.config = self.config.with_api_base(api_base);
        self
    }

    /// Fail calls that take longer than `deadline` with [BackendFailure::Timeout].
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn build(self) -> OpenAIBackend {
        OpenAIBackend {
            client: Client::with_config(self.config).with_backoff(no_retries()),
            deadline: self.deadline,
        }
    }
}

/// The client retries rate-limited requests by default; a zero elapsed-time budget turns that off.
fn no_retries() -> backoff::ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

impl OpenAIBackend {
    pub fn builder() -> OpenAIBackendBuilder {
        OpenAIBackendBuilder::default()
    }

    /// A backend for the default endpoint with no deadline.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder().with_api_key(api_key).build()
    }

    async fn send(&self, request: CreateChatCompletionRequest) -> Result<String, BackendError> {
        let response = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.client.chat().create(request))
                .await
                .map_err(|_| BackendError::new(BackendFailure::Timeout, format!("no reply within {:?}", deadline)))?,
            None => self.client.chat().create(request).await,
        }.map_err(backend_error)?;
        let content = response.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(content)
    }
}

/// Builds the single-message chat request for a prompt.
pub fn build_request(prompt: &str, config: &GenerationConfig) -> Result<CreateChatCompletionRequest, BackendError> {
    let message = ChatCompletionRequestUserMessageArgs::default()
        .content(prompt)
        .build()
        .map_err(backend_error)?;
    let mut args = CreateChatCompletionRequestArgs::default();
    args.model(config.model.as_str())
        .temperature(config.temperature)
        .messages(vec![ChatCompletionRequestMessage::User(message)]);
    if let Some(max_tokens) = config.max_tokens {
        args.max_tokens(max_tokens);
    }
    args.build().map_err(backend_error)
}

/// Warns when the prompt plus the requested reply length cannot fit the model's context window.
fn check_context_window(prompt: &str, config: &GenerationConfig) {
    if let Some(counter) = Tiktoken::for_model(&config.model) {
        let prompt_tokens = counter.count_token(prompt);
        debug!("prompt is {} tokens for {}", prompt_tokens, counter.model);
        if !counter.fits(prompt_tokens, config.max_tokens) {
            warn!("prompt of {} tokens plus max_tokens {:?} exceeds the {} token context of {}",
                  prompt_tokens, config.max_tokens, counter.context_size, config.model);
        }
    }
}

fn backend_error(err: OpenAIError) -> BackendError {
    let failure = match &err {
        OpenAIError::Reqwest(_) => BackendFailure::Transport,
        OpenAIError::ApiError(_) => BackendFailure::Api,
        _ => BackendFailure::InvalidRequest,
    };
    BackendError::new(failure, err.to_string())
}

#[async_trait]
impl GenerateText for OpenAIBackend {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, BackendError> {
        if log_enabled!(Level::Warn) {
            check_context_window(prompt, config);
        }
        let request = build_request(prompt, config)?;
        debug!("sending chat completion request to {} at temperature {}", config.model, config.temperature);
        self.send(request).await
    }
}
