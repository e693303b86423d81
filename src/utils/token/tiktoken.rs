use std::collections::HashMap;
pub use tiktoken_rs::{get_bpe_from_model, CoreBPE};

use crate::utils::token::CountToken;
use lazy_static::lazy_static;

lazy_static! {
    /// const map from model family to its context window in tokens.
    pub static ref MODEL_TO_MAX_TOKENS: HashMap<&'static str, usize> = HashMap::from([
        ("gpt-4", 8192),
        ("gpt-4-32k", 32768),
        ("gpt-4-turbo", 128000),
        ("gpt-3.5-turbo", 4096),
        ("gpt-3.5-turbo-16k", 16385),
    ]);

    /// Tokenizer shared by every family above, all of which use `cl100k_base`. Built once.
    static ref CL100K_BASE: Option<CoreBPE> = get_bpe_from_model("gpt-4").ok();
}

/// Maps a model name to the model family used for tokenizer and context window lookups.
///
/// Returns `None` for models we do not know the context window of.
pub fn model_family(model: &str) -> Option<&'static str> {
    if model.starts_with("gpt-4-32k") {
        Some("gpt-4-32k")
    } else if model.starts_with("gpt-4-turbo") || (model.starts_with("gpt-4-") && model.ends_with("-preview")) {
        Some("gpt-4-turbo")
    } else if model.starts_with("gpt-4-") || model == "gpt-4" {
        Some("gpt-4")
    } else if model.starts_with("gpt-3.5-turbo-16k")
        || model.starts_with("gpt-3.5-turbo-1106")
        || model.starts_with("gpt-3.5-turbo-0125") {
        Some("gpt-3.5-turbo-16k")
    } else if model.starts_with("gpt-3.5-turbo") {
        Some("gpt-3.5-turbo")
    } else {
        None
    }
}

/// Counter using the Tiktoken tokenizer.
#[derive(Clone)]
#[readonly::make]
pub struct Tiktoken {
    /// The model family of the tokenizer. read-only.
    #[readonly]
    pub model: &'static str,
    /// The context window of the model family. read-only.
    #[readonly]
    pub context_size: usize,
    /// The tokenizer. read-only.
    #[readonly]
    pub bpe: &'static CoreBPE,
}

impl Tiktoken {
    /// Create a new Tiktoken counter, or `None` if the model is not a known GPT model.
    pub fn for_model(model: &str) -> Option<Self> {
        let family = model_family(model)?;
        let context_size = *MODEL_TO_MAX_TOKENS.get(family)?;
        let bpe = CL100K_BASE.as_ref()?;
        Some(Tiktoken {
            model: family,
            context_size,
            bpe,
        })
    }

    /// Whether `prompt_tokens` plus the requested completion length fit into the context window.
    pub fn fits(&self, prompt_tokens: usize, max_tokens: Option<u16>) -> bool {
        prompt_tokens + max_tokens.map_or(0, usize::from) <= self.context_size
    }
}

impl CountToken for Tiktoken {
    fn count_token(&self, string: &str) -> usize {
        self.bpe.encode_with_special_tokens(string).len()
    }
}
