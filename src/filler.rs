//! Fillers fill placeholders of a [PartialPrompt].

use crate::prompt::errors::PlaceholderNotExist;
use crate::prompt::{Bindings, PartialPrompt};

pub trait Fill {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<(), PlaceholderNotExist>;
}

/// Fills in key order and stops at the first key the template does not declare.
impl Fill for Bindings {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<(), PlaceholderNotExist> {
        for (placeholder, value) in self {
            partial_prompt.try_fill(placeholder.as_str(), value.as_str())?;
        }
        Ok(())
    }
}
