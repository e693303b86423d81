//! Text generators, the endpoint of a prompt pipeline.

use std::error::Error;
use std::fmt;
use std::fmt::Formatter;
use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod openai;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on the length of the reply, in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u16>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

impl GenerationConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u16) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

//TODO: when async fn in trait is object safe, remove async_trait macro

/// Anything that turns a finished prompt into a reply.
///
/// Implementations make at most one request per call and never retry.
#[async_trait]
pub trait GenerateText: Send + Sync {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, BackendError>;
}

#[async_trait]
impl<T: GenerateText + ?Sized> GenerateText for Arc<T> {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, BackendError> {
        (**self).generate(prompt, config).await
    }
}

/// Why a text generator could not produce a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailure {
    /// Connection, TLS or stream errors.
    Transport,
    /// The API answered with an error, e.g. a bad credential or a rate limit.
    Api,
    /// The call did not finish before its deadline.
    Timeout,
    /// The request could not be built or the reply could not be read.
    InvalidRequest,
}

/// Error when a text generator fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub failure: BackendFailure,
    pub message: String,
}

impl BackendError {
    pub fn new(failure: BackendFailure, message: impl Into<String>) -> Self {
        Self {
            failure,
            message: message.into(),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} failure: {}", self.failure, self.message)
    }
}

impl Error for BackendError {}
