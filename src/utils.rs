use serde_json::{Map, Value};

pub mod token;
pub mod llm;
pub mod postprocess;
#[cfg(feature = "terminal_printing")]
pub mod printing;
pub(crate) mod prompt_processing;

/// JSON object, used for template metadata.
pub type JsonMap = Map<String, Value>;
