//! # promptchain
//!
//! Prompt templates piped through a pluggable LLM backend.
//!
//! ## Why `promptchain`
//!
//! Most "call an LLM with a template" code is three steps glued together: fill a template, send the text to a model, hand
//! the reply back. `promptchain` keeps those three steps as plain, explicit function calls so that every step of building
//! a prompt can be tracked and tested without a network connection.
//!
//! ## Concepts and Design
//!
//! ### Prompt Template and Placeholder
//!
//! A template of prompts, for example
//!
//! ```text
//! Explain {topic} in simple terms that a beginner could understand.
//! ```
//!
//! `{topic}` is a placeholder with the name `"topic"`. A placeholder name is an identifier: letters, digits and
//! underscores, not starting with a digit. Braces around anything else are left alone, so JSON snippets in a template
//! stay literal. Nesting like `{{topic}}` is rejected when the template is created.
//!
//! A [`PromptTemplate`](crate::prompt::PromptTemplate) declares a set of variables, and the declared set must be exactly
//! the set of placeholders in its text. Build one with [`PromptTemplate::new`](crate::prompt::PromptTemplate::new) to
//! declare whatever the text uses, or with [`PromptTemplate::with_variables`](crate::prompt::PromptTemplate::with_variables)
//! to have the declaration checked against the text.
//!
//! ### Partial Prompt
//!
//! A [`PartialPrompt`](crate::prompt::PartialPrompt) is an incomplete construction of a template. It records which
//! placeholder got filled by what value, and which placeholders are still empty. When everything is filled,
//! [`PartialPrompt::complete`](crate::prompt::PartialPrompt::complete) gives back the concrete prompt.
//!
//! ### Filler
//!
//! Anything that fills placeholders of a partial prompt implements [`Fill`](crate::filler::Fill). The plain
//! [`Bindings`](crate::prompt::Bindings) map is the filler used by [`render`](crate::prompt::render).
//!
//! ### Endpoint or LLM
//!
//! The endpoint of the `PromptTemplate -> PartialPrompt -> String` pipeline is a text generator, anything implementing
//! [`GenerateText`](crate::utils::llm::GenerateText). [`OpenAIBackend`](crate::utils::llm::openai::OpenAIBackend) talks to
//! the OpenAI chat-completions API; tests plug in fakes.
//!
//! ### Chain
//!
//! [`chain::run`](crate::chain::run) and [`LLMChain`](crate::chain::LLMChain) do render, then exactly one generator call,
//! then output parsing, and stop at the first failure. There are no retries and nothing is cached between calls.
//!
//! ```no_run
//! # async fn demo() -> Result<(), promptchain::chain::ChainError> {
//! use promptchain::chain::run;
//! use promptchain::prompt::{Bindings, PromptTemplate};
//! use promptchain::utils::llm::GenerationConfig;
//! use promptchain::utils::llm::openai::OpenAIBackend;
//!
//! let template = PromptTemplate::new("Explain {topic} in simple terms.").unwrap();
//! let bindings = Bindings::from([("topic".to_string(), "machine learning".to_string())]);
//! let backend = OpenAIBackend::new("sk-...");
//! let reply = run(&template, &bindings, &GenerationConfig::default(), &backend).await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! `promptchain` is free under Apache license.
//!
//! ## Attribution
//! * `tiktoken-rs`: In [crate::utils::token::tiktoken], we re-export parts of the `tiktoken-rs` crate.


pub mod prompt;
pub mod filler;
pub mod chain;
pub mod utils;
