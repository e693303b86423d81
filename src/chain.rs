//! # Chain
//! A chain is render, then generate, then parse, in that order and nothing else.
//!
//! Each run makes exactly one call to the text generator, or none at all when rendering fails. Failures are not retried
//! and a run never continues past a failing step.

use std::error::Error;
use std::fmt;
use std::fmt::Formatter;
use log::debug;

use crate::prompt::errors::{PlaceholderNotExist, RenderError, UnfilledPlaceholders};
use crate::prompt::{render, Bindings, PromptTemplate};
use crate::utils::llm::{BackendError, GenerateText, GenerationConfig};
use crate::utils::postprocess::{ParseOutput, StrOutputParser};

/// Everything a single run needs besides the chain itself. Consumed by [LLMChain::invoke].
#[derive(Debug, Clone, Default)]
pub struct InvocationRequest {
    pub bindings: Bindings,
    pub config: GenerationConfig,
}

impl InvocationRequest {
    pub fn new(bindings: Bindings, config: GenerationConfig) -> Self {
        Self { bindings, config }
    }
}

/// Kind of a [ChainError], for callers that only need to branch on what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingVariable,
    UnknownVariable,
    BackendUnavailable,
    EmptyResponse,
}

/// Error of a chain run.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainError {
    /// A placeholder of the template has no binding.
    MissingVariable(UnfilledPlaceholders),
    /// A binding names a variable the template does not declare.
    UnknownVariable(PlaceholderNotExist),
    /// The text generator failed.
    BackendUnavailable(BackendError),
    /// The text generator answered with nothing but whitespace.
    EmptyResponse { model: String },
}

impl ChainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChainError::MissingVariable(_) => ErrorKind::MissingVariable,
            ChainError::UnknownVariable(_) => ErrorKind::UnknownVariable,
            ChainError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            ChainError::EmptyResponse { .. } => ErrorKind::EmptyResponse,
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::MissingVariable(e) => fmt::Display::fmt(e, f),
            ChainError::UnknownVariable(e) => fmt::Display::fmt(e, f),
            ChainError::BackendUnavailable(e) => write!(f, "BackendUnavailable: {}", e),
            ChainError::EmptyResponse { model } => write!(f, "EmptyResponse: model {} returned no content", model),
        }
    }
}

impl Error for ChainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ChainError::MissingVariable(e) => Some(e),
            ChainError::UnknownVariable(e) => Some(e),
            ChainError::BackendUnavailable(e) => Some(e),
            ChainError::EmptyResponse { .. } => None,
        }
    }
}

impl From<RenderError> for ChainError {
    fn from(value: RenderError) -> Self {
        match value {
            RenderError::MissingVariable(e) => ChainError::MissingVariable(e),
            RenderError::UnknownVariable(e) => ChainError::UnknownVariable(e),
        }
    }
}

impl From<BackendError> for ChainError {
    fn from(value: BackendError) -> Self {
        ChainError::BackendUnavailable(value)
    }
}

/// Render `template` with `bindings`, send the prompt to `generator` once, and return the reply untouched.
pub async fn run<G>(template: &PromptTemplate,
                    bindings: &Bindings,
                    config: &GenerationConfig,
                    generator: &G) -> Result<String, ChainError>
    where G: GenerateText + ?Sized {
    run_with_parser(template, bindings, config, generator, &StrOutputParser).await
}

async fn run_with_parser<G, P>(template: &PromptTemplate,
                               bindings: &Bindings,
                               config: &GenerationConfig,
                               generator: &G,
                               parser: &P) -> Result<P::Output, ChainError>
    where G: GenerateText + ?Sized,
          P: ParseOutput {
    let prompt = render(template, bindings)?;
    debug!("invoking {} with a prompt of {} bytes", config.model, prompt.len());
    let raw = generator.generate(&prompt, config).await?;
    if raw.trim().is_empty() {
        return Err(ChainError::EmptyResponse { model: config.model.clone() });
    }
    Ok(parser.parse(raw))
}

/// A template, a text generator and an output parser bound together.
pub struct LLMChain<G, P = StrOutputParser> {
    template: PromptTemplate,
    generator: G,
    parser: P,
}

impl<G: GenerateText> LLMChain<G> {
    pub fn new(template: PromptTemplate, generator: G) -> Self {
        Self {
            template,
            generator,
            parser: StrOutputParser,
        }
    }
}

impl<G: GenerateText, P: ParseOutput> LLMChain<G, P> {
    /// Replace the output parser.
    pub fn with_parser<Q: ParseOutput>(self, parser: Q) -> LLMChain<G, Q> {
        LLMChain {
            template: self.template,
            generator: self.generator,
            parser,
        }
    }

    #[inline]
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub async fn run(&self, bindings: &Bindings, config: &GenerationConfig) -> Result<P::Output, ChainError> {
        run_with_parser(&self.template, bindings, config, &self.generator, &self.parser).await
    }

    pub async fn invoke(&self, request: InvocationRequest) -> Result<P::Output, ChainError> {
        self.run(&request.bindings, &request.config).await
    }
}

#[cfg(test)]
mod test_chain {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use async_trait::async_trait;
    use super::{run, ChainError, ErrorKind, InvocationRequest, LLMChain};
    use crate::prompt::{Bindings, PromptTemplate};
    use crate::utils::llm::{BackendError, BackendFailure, GenerateText, GenerationConfig};
    use crate::utils::postprocess::ParseOutput;

    struct FakeGenerator {
        reply: Result<String, BackendError>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        fn replying(reply: &str) -> Self {
            Self::with_result(Ok(reply.to_string()))
        }

        fn with_result(reply: Result<String, BackendError>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerateText for FakeGenerator {
        async fn generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn topic_template() -> PromptTemplate {
        PromptTemplate::with_variables("Explain {topic} in simple terms.", ["topic"]).unwrap()
    }

    fn topic(value: &str) -> Bindings {
        Bindings::from([("topic".to_string(), value.to_string())])
    }

    #[tokio::test]
    async fn test_end_to_end_success() {
        let generator = FakeGenerator::replying("ML is...");
        let reply = run(&topic_template(), &topic("machine learning"), &GenerationConfig::default(), &generator).await;
        assert_eq!(Ok("ML is...".to_string()), reply);
        assert_eq!(1, generator.calls());
        assert_eq!(vec!["Explain machine learning in simple terms.".to_string()], *generator.prompts.lock().unwrap());
    }

    #[tokio::test]
    async fn test_missing_variable_never_calls_backend() {
        let generator = FakeGenerator::replying("unused");
        let err = run(&topic_template(), &Bindings::new(), &GenerationConfig::default(), &generator).await.unwrap_err();
        assert_eq!(ErrorKind::MissingVariable, err.kind());
        assert_eq!(0, generator.calls());
    }

    #[tokio::test]
    async fn test_unknown_variable_never_calls_backend() {
        let generator = FakeGenerator::replying("unused");
        let mut bindings = topic("rust");
        bindings.insert("audience".to_string(), "kids".to_string());
        let err = run(&topic_template(), &bindings, &GenerationConfig::default(), &generator).await.unwrap_err();
        assert_eq!(ErrorKind::UnknownVariable, err.kind());
        assert_eq!(0, generator.calls());
    }

    #[tokio::test]
    async fn test_empty_response() {
        for reply in ["", "  \n"] {
            let generator = FakeGenerator::replying(reply);
            let err = run(&topic_template(), &topic("rust"), &GenerationConfig::default(), &generator).await.unwrap_err();
            assert_eq!(ChainError::EmptyResponse { model: "gpt-3.5-turbo".to_string() }, err);
            assert_eq!(1, generator.calls());
        }
    }

    #[tokio::test]
    async fn test_backend_failure_is_not_retried() {
        let failure = BackendError::new(BackendFailure::Transport, "connection refused");
        let generator = FakeGenerator::with_result(Err(failure.clone()));
        let err = run(&topic_template(), &topic("rust"), &GenerationConfig::default(), &generator).await.unwrap_err();
        assert_eq!(ErrorKind::BackendUnavailable, err.kind());
        assert_ne!(ErrorKind::MissingVariable, err.kind());
        assert_ne!(ErrorKind::EmptyResponse, err.kind());
        assert_eq!(ChainError::BackendUnavailable(failure), err);
        assert_eq!(1, generator.calls());
    }

    #[tokio::test]
    async fn test_chain_one_call_per_run() {
        let generator = Arc::new(FakeGenerator::replying("ok"));
        let chain = LLMChain::new(topic_template(), generator.clone());
        for value in ["a", "b", "c"] {
            chain.run(&topic(value), &GenerationConfig::default()).await.unwrap();
        }
        let request = InvocationRequest::new(topic("d"), GenerationConfig::default().with_temperature(0.1));
        assert_eq!("ok", chain.invoke(request).await.unwrap());
        assert_eq!(4, generator.calls());
        assert_eq!(vec!["topic".to_string()], chain.template().variables());
    }

    struct Shout;

    impl ParseOutput for Shout {
        type Output = String;

        fn parse(&self, raw: String) -> String {
            raw.to_uppercase()
        }
    }

    #[tokio::test]
    async fn test_custom_parser() {
        let chain = LLMChain::new(topic_template(), FakeGenerator::replying("ml is...")).with_parser(Shout);
        assert_eq!("ML IS...", chain.run(&topic("ml"), &GenerationConfig::default()).await.unwrap());
    }
}
