//! # Prompt
//! A prompt is simply a string
//! ## PromptTemplate
//! A prompt template is a string with placeholders plus the set of variables it declares. The declared variables and
//! the placeholders in the string are always the same set.
//!
//! ## Placeholder
//! A placeholder is a string that is in the format of `{name}`, where `name` is an identifier. It can be filled with a
//! value.
//!
//! ## PartialPrompt
//! A partial prompt is a prompt template with some placeholders filled. A partial prompt can be only constructed from a
//! prompt template via [PromptTemplate::construct_prompt].
//!
//! The placeholders in a partial prompt can be filled with values via [PartialPrompt::try_fill], which also updates the
//! filling values of already filled placeholders.
//! When all placeholders are filled, the partial prompt can be completed via [PartialPrompt::complete], in which the
//! placeholders in a template are **actually** replaced with the filling values.
//!
//! ## Rendering
//! [render] is the one-shot version: construct, fill with a [Bindings] map, complete.


use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use crate::filler::Fill;
use crate::prompt::errors::{PlaceholderNotExist, RenderError, TemplateError, UnfilledPlaceholders};
use crate::utils::prompt_processing::{find_nested_placeholder, get_placeholders, replace_all_placeholders};
use crate::utils::JsonMap;
use log::{debug, warn};

/// Mapping from placeholder name to its filling value.
///
/// Ordered, so that filling and error reporting do not depend on hashing.
pub type Bindings = BTreeMap<String, String>;

/// A prompt template with some placeholders filled. A partial prompt can be only constructed from a prompt template via [PromptTemplate::construct_prompt].
#[derive(Debug, Clone)]
#[readonly::make]
pub struct PartialPrompt {
    /// The template of the partial prompt, readonly
    #[readonly]
    pub template: PromptTemplate,

    /// Mapping from placeholder name to its filling value
    pub(crate) placeholder_to_vals: HashMap<String, Option<String>>,

    /// Record the placeholders that are not filled yet
    pub(crate) unfilled_placeholders: HashSet<String>,
}

impl PartialPrompt {
    /// Fill the placeholders in the partial prompt with the given values.
    /// Returns an error if the placeholder does not exist.
    pub fn try_fill(&mut self, placeholder: impl Into<String>, value: impl Into<String>) -> Result<&mut Self, PlaceholderNotExist> {
        let placeholder = placeholder.into();
        if self.placeholder_to_vals.contains_key(&placeholder) {
            self.unfilled_placeholders.remove(&placeholder);
            self.placeholder_to_vals.insert(placeholder, Some(value.into()));
            Ok(self)
        } else {
            Err(PlaceholderNotExist::new(placeholder, &self.template.placeholders))
        }
    }

    /// Whether every placeholder has a filling value.
    pub fn is_complete(&self) -> bool {
        self.unfilled_placeholders.is_empty()
    }

    /// Complete the partial prompt and return the completed prompt.
    /// Returns an error if there are still unfilled placeholders.
    pub fn complete(&self) -> Result<String, UnfilledPlaceholders> {
        if self.is_complete() {
            Ok(replace_all_placeholders(self.template.str(), &self.placeholder_to_vals))
        } else {
            Err(UnfilledPlaceholders::new(&self.template.placeholders, &self.unfilled_placeholders))
        }
    }
}

/// A prompt template with placeholders.
#[derive(Debug, Clone)]
#[readonly::make]
pub struct PromptTemplate {
    /// The template of the partial prompt, immutable
    template: Arc<String>,

    /// The declared variables, which are exactly the placeholders in the template. readonly
    #[readonly]
    pub placeholders: HashSet<String>,

    /// Metadata of the template, readonly
    #[readonly]
    pub meta_data: Arc<JsonMap>,
}

impl PromptTemplate {
    /// Create a prompt template that declares every placeholder found in the string.
    /// Warns if the template does not have any placeholder.
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        Self::build(template.into(), None, JsonMap::new())
    }

    /// Same as [PromptTemplate::new], with metadata attached to the template.
    pub fn with_metadata(template: impl Into<String>, metadata: JsonMap) -> Result<Self, TemplateError> {
        Self::build(template.into(), None, metadata)
    }

    /// Create a prompt template with an explicit list of declared variables.
    ///
    /// Fails if the string uses a placeholder that is not declared, or if a declared variable never appears in the
    /// string.
    pub fn with_variables<I, S>(template: impl Into<String>, variables: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item=S>,
        S: Into<String>,
    {
        let variables = variables.into_iter().map(Into::into).collect();
        Self::build(template.into(), Some(variables), JsonMap::new())
    }

    fn build(template: String, declared: Option<HashSet<String>>, metadata: JsonMap) -> Result<Self, TemplateError> {
        if let Some(placeholder) = find_nested_placeholder(&template) {
            return Err(TemplateError::NestedPlaceholder { placeholder });
        }
        let placeholders = get_placeholders(&template);
        if let Some(declared) = declared {
            let undeclared = sorted(placeholders.difference(&declared));
            if !undeclared.is_empty() {
                return Err(TemplateError::UndeclaredPlaceholders { placeholders: undeclared });
            }
            let unused = sorted(declared.difference(&placeholders));
            if !unused.is_empty() {
                return Err(TemplateError::UnusedVariables { variables: unused });
            }
        }
        if placeholders.is_empty() {
            warn!("Your prompt template does not have a placeholder. If this is intended, ignore this message. \
            Otherwise, check whether you have written placeholders correctly.\n\
            Got prompt template:\n\
            {}", template);
        }
        Ok(Self {
            template: Arc::new(template),
            placeholders,
            meta_data: Arc::new(metadata),
        })
    }

    /// Get the prompt template as a string.
    #[inline]
    pub fn str(&self) -> &str {
        &self.template
    }

    /// Declared variables in sorted order.
    pub fn variables(&self) -> Vec<String> {
        sorted(self.placeholders.iter())
    }

    /// Construct a partial prompt from the prompt template.
    pub fn construct_prompt(&self) -> PartialPrompt {
        PartialPrompt {
            template: self.clone(),
            placeholder_to_vals: self.placeholders.iter().map(|p| (p.clone(), None)).collect(),
            unfilled_placeholders: self.placeholders.clone(),
        }
    }
}

/// Fill every placeholder of `template` from `bindings` and return the finished prompt.
///
/// Bindings are applied in key order. A key that is not a placeholder of the template fails with
/// [RenderError::UnknownVariable]; a placeholder without a binding fails with [RenderError::MissingVariable].
pub fn render(template: &PromptTemplate, bindings: &Bindings) -> Result<String, RenderError> {
    let mut partial_prompt = template.construct_prompt();
    bindings.fill(&mut partial_prompt)?;
    let prompt = partial_prompt.complete()?;
    debug!("rendered prompt with {} binding(s), {} bytes", bindings.len(), prompt.len());
    Ok(prompt)
}

pub(crate) fn sorted<'a>(names: impl Iterator<Item=&'a String>) -> Vec<String> {
    let mut names: Vec<String> = names.cloned().collect();
    names.sort();
    names
}

pub mod errors {
    use std::collections::HashSet;
    use std::error::Error;
    use std::fmt;
    use std::fmt::Formatter;
    use super::sorted;

    /// Error when trying to complete a partial prompt but there are still unfilled placeholders.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UnfilledPlaceholders {
        pub unfilled_placeholders: Vec<String>,
        pub all_placeholders: Vec<String>,
    }

    impl UnfilledPlaceholders {
        pub(crate) fn new(all_placeholders: &HashSet<String>, unfilled_placeholders: &HashSet<String>) -> Self {
            UnfilledPlaceholders {
                unfilled_placeholders: sorted(unfilled_placeholders.iter()),
                all_placeholders: sorted(all_placeholders.iter()),
            }
        }
    }

    impl fmt::Display for UnfilledPlaceholders {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "MissingVariable: to complete the prompt template,\n  Requires Placeholders:{:?}\n  Unfilled Placeholders:{:?}",
                   self.all_placeholders, self.unfilled_placeholders)
        }
    }

    impl Error for UnfilledPlaceholders {}

    /// Error when trying to fill a placeholder that does not exist in the prompt template of the partial prompt.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PlaceholderNotExist {
        pub try_fill_placeholder: String,
        pub available_placeholders: Vec<String>,
    }

    impl PlaceholderNotExist {
        pub(crate) fn new(try_fill_placeholder: impl Into<String>,
                          available_placeholders: &HashSet<String>) -> Self {
            PlaceholderNotExist {
                try_fill_placeholder: try_fill_placeholder.into(),
                available_placeholders: sorted(available_placeholders.iter()),
            }
        }
    }

    impl fmt::Display for PlaceholderNotExist {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "UnknownVariable: try to fill placeholder = {}, but available placeholders are {:?}",
                   self.try_fill_placeholder,
                   self.available_placeholders)
        }
    }

    impl Error for PlaceholderNotExist {}

    /// Error when a template's text and its declared variables disagree.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TemplateError {
        /// The text uses placeholders that are not declared.
        UndeclaredPlaceholders { placeholders: Vec<String> },
        /// Declared variables that never appear in the text.
        UnusedVariables { variables: Vec<String> },
        /// A placeholder wrapped in an extra pair of braces, like `{{name}}`.
        NestedPlaceholder { placeholder: String },
    }

    impl fmt::Display for TemplateError {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            match self {
                TemplateError::UndeclaredPlaceholders { placeholders } =>
                    write!(f, "TemplateError: placeholders {:?} are used but not declared", placeholders),
                TemplateError::UnusedVariables { variables } =>
                    write!(f, "TemplateError: variables {:?} are declared but never used", variables),
                TemplateError::NestedPlaceholder { placeholder } =>
                    write!(f, "TemplateError: placeholder {} is nested in another pair of braces", placeholder),
            }
        }
    }

    impl Error for TemplateError {}

    /// Error when rendering a template with a set of bindings.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RenderError {
        MissingVariable(UnfilledPlaceholders),
        UnknownVariable(PlaceholderNotExist),
    }

    impl fmt::Display for RenderError {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            match self {
                RenderError::MissingVariable(e) => fmt::Display::fmt(e, f),
                RenderError::UnknownVariable(e) => fmt::Display::fmt(e, f),
            }
        }
    }

    impl Error for RenderError {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            match self {
                RenderError::MissingVariable(e) => Some(e),
                RenderError::UnknownVariable(e) => Some(e),
            }
        }
    }

    impl From<UnfilledPlaceholders> for RenderError {
        fn from(value: UnfilledPlaceholders) -> Self {
            RenderError::MissingVariable(value)
        }
    }

    impl From<PlaceholderNotExist> for RenderError {
        fn from(value: PlaceholderNotExist) -> Self {
            RenderError::UnknownVariable(value)
        }
    }
}
