//! The canned demonstrations and the runner that walks through them.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use anyhow::{Context, Result};
use log::{info, warn};
use promptchain::chain::run;
use promptchain::prompt::errors::TemplateError;
use promptchain::prompt::{render, Bindings, PromptTemplate};
use promptchain::utils::llm::{GenerateText, GenerationConfig};
use serde::{Deserialize, Serialize};

use crate::console::Console;

/// A titled template with one or more sets of bindings to run it with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demonstration {
    pub title: String,
    pub template: String,
    pub variables: Vec<String>,
    /// Header printed before each run, rendered from the subset of the run's bindings it mentions.
    /// The title is used when it is left out.
    #[serde(default)]
    pub announce: String,
    pub runs: Vec<Bindings>,
    #[serde(default)]
    pub config: GenerationConfig,
}

impl Demonstration {
    pub fn prompt_template(&self) -> Result<PromptTemplate, TemplateError> {
        PromptTemplate::with_variables(self.template.as_str(), &self.variables)
    }

    /// The run header. Falls back to the raw announce text if it cannot be rendered.
    pub fn announcement(&self, bindings: &Bindings) -> String {
        if self.announce.trim().is_empty() {
            return self.title.clone();
        }
        let announce = match PromptTemplate::new(self.announce.as_str()) {
            Ok(announce) => announce,
            Err(_) => return self.announce.clone(),
        };
        let mentioned: Bindings = bindings.iter()
            .filter(|(name, _)| announce.placeholders.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        render(&announce, &mentioned).unwrap_or_else(|_| self.announce.clone())
    }
}

fn bindings(pairs: &[(&str, &str)]) -> Bindings {
    pairs.iter().map(|(name, value)| (name.to_string(), value.to_string())).collect()
}

/// The four demonstrations shipped with the binary.
pub fn builtin() -> Vec<Demonstration> {
    vec![
        Demonstration {
            title: "Simple Explanation Chain".to_string(),
            template: "Explain {topic} in simple terms that a beginner could understand.".to_string(),
            variables: vec!["topic".to_string()],
            announce: "📚 Topic: {topic}".to_string(),
            runs: ["machine learning", "neural networks", "natural language processing"]
                .into_iter()
                .map(|topic| bindings(&[("topic", topic)]))
                .collect(),
            config: GenerationConfig::default().with_temperature(0.7),
        },
        Demonstration {
            title: "Creative Writing Chain".to_string(),
            template: "Write a short creative story (2-3 paragraphs) about {subject} in the genre of {genre}.".to_string(),
            variables: vec!["subject".to_string(), "genre".to_string()],
            announce: "✍️ Generating {genre} story...".to_string(),
            runs: vec![bindings(&[("subject", "a robot learning to paint"), ("genre", "science fiction")])],
            config: GenerationConfig::default().with_temperature(0.9),
        },
        Demonstration {
            title: "Structured Output Chain".to_string(),
            template: "Analyze the following concept and provide a structured response:\n\n\
                       Concept: {concept}\n\n\
                       Please provide:\n\
                       1. Definition (1-2 sentences)\n\
                       2. Key characteristics (3 bullet points)\n\
                       3. Real-world applications (2-3 examples)\n\
                       4. Related concepts (2-3 items)".to_string(),
            variables: vec!["concept".to_string()],
            announce: "🔍 Analyzing concept: '{concept}'".to_string(),
            runs: vec![bindings(&[("concept", "API (Application Programming Interface)")])],
            config: GenerationConfig::default().with_temperature(0.3),
        },
        Demonstration {
            title: "Translation Chain".to_string(),
            template: "Translate the following text from {source_language} to {target_language}.\n\n\
                       Text: {text}\n\n\
                       Translation:".to_string(),
            variables: vec!["source_language".to_string(), "target_language".to_string(), "text".to_string()],
            announce: "🌐 Translating text from {source_language} to {target_language}...".to_string(),
            runs: vec![bindings(&[
                ("source_language", "English"),
                ("target_language", "Spanish"),
                ("text", "Artificial intelligence is transforming how we interact with technology."),
            ])],
            config: GenerationConfig::default().with_temperature(0.3),
        },
    ]
}

/// Load demonstrations from a JSON array.
pub fn load(path: &Path) -> Result<Vec<Demonstration>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read demonstrations from {}", path.display()))?;
    let demos: Vec<Demonstration> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse demonstrations in {}", path.display()))?;
    Ok(demos)
}

/// Counts of a pass over the demonstrations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemoOutcome {
    pub runs: usize,
    pub failures: usize,
}

/// Run every demonstration in order, one chain call per run.
///
/// A failing run is reported on the console and the pass moves on to the next run.
pub async fn run_all<G, O, E>(demos: &[Demonstration],
                              generator: &G,
                              model: Option<&str>,
                              console: &mut Console<O, E>) -> io::Result<DemoOutcome>
    where G: GenerateText + ?Sized,
          O: Write,
          E: Write {
    let mut outcome = DemoOutcome::default();
    for (idx, demo) in demos.iter().enumerate() {
        console.banner(&format!("DEMO {}: {}", idx + 1, demo.title))?;
        let template = match demo.prompt_template() {
            Ok(template) => template,
            Err(err) => {
                warn!("skipping demonstration {:?}: {}", demo.title, err);
                console.line(&format!("⚠️ Skipped: {}", err))?;
                outcome.runs += demo.runs.len();
                outcome.failures += demo.runs.len();
                continue;
            }
        };
        let config = match model {
            Some(model) => demo.config.clone().with_model(model),
            None => demo.config.clone(),
        };
        for bindings in &demo.runs {
            console.section(&demo.announcement(bindings))?;
            outcome.runs += 1;
            match run(&template, bindings, &config, generator).await {
                Ok(reply) => console.response(&reply)?,
                Err(err) => {
                    outcome.failures += 1;
                    console.failure(&err)?;
                }
            }
        }
    }
    info!("ran {} demonstration call(s), {} failed", outcome.runs, outcome.failures);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use async_trait::async_trait;
    use promptchain::prompt::{render, Bindings};
    use promptchain::utils::llm::{BackendError, BackendFailure, GenerateText, GenerationConfig};

    use super::{builtin, load, run_all, Demonstration, DemoOutcome};
    use crate::console::{captured, text_of};

    /// Replies with the prompt, or fails on the call numbers listed in `fail_on`.
    struct Echo {
        calls: AtomicUsize,
        fail_on: Vec<usize>,
        seen: Mutex<Vec<(String, GenerationConfig)>>,
    }

    impl Echo {
        fn failing_on(fail_on: Vec<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerateText for Echo {
        async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, BackendError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.seen.lock().unwrap().push((prompt.to_string(), config.clone()));
            if self.fail_on.contains(&call) {
                Err(BackendError::new(BackendFailure::Api, "rate limited"))
            } else {
                Ok(format!("reply to: {}", prompt))
            }
        }
    }

    #[test]
    fn test_builtin_demonstrations_are_valid() {
        let demos = builtin();
        assert_eq!(4, demos.len());
        for demo in &demos {
            let template = demo.prompt_template().unwrap();
            for bindings in &demo.runs {
                let prompt = render(&template, bindings).unwrap();
                assert!(!prompt.contains('{'), "unresolved placeholder in {}", prompt);
                assert!(!demo.announcement(bindings).contains('{'));
            }
        }
        assert_eq!(3, demos[0].runs.len());
        assert_eq!(0.9, demos[1].config.temperature);
    }

    #[test]
    fn test_announcement_uses_subset() {
        let demo = &builtin()[3];
        assert_eq!("🌐 Translating text from English to Spanish...", demo.announcement(&demo.runs[0]));
    }

    #[tokio::test]
    async fn test_run_all_continues_after_failure() {
        let echo = Echo::failing_on(vec![2]);
        let mut console = captured();
        let outcome = run_all(&builtin(), &echo, None, &mut console).await.unwrap();
        assert_eq!(DemoOutcome { runs: 6, failures: 1 }, outcome);
        assert_eq!(6, echo.calls.load(Ordering::SeqCst));

        let (out, err) = text_of(console);
        assert!(out.contains("DEMO 4: Translation Chain"));
        assert!(out.contains("reply to: Explain machine learning in simple terms that a beginner could understand."));
        assert!(!out.contains("reply to: Explain neural networks"));
        assert!(err.contains("BackendUnavailable"));
    }

    #[tokio::test]
    async fn test_model_override() {
        let echo = Echo::failing_on(vec![]);
        let mut console = captured();
        run_all(&builtin()[1..2], &echo, Some("gpt-4"), &mut console).await.unwrap();
        let seen = echo.seen.lock().unwrap();
        assert_eq!(1, seen.len());
        assert_eq!("gpt-4", seen[0].1.model);
        assert_eq!(0.9, seen[0].1.temperature);
    }

    #[tokio::test]
    async fn test_invalid_demonstration_counts_as_failures() {
        let broken = Demonstration {
            title: "Broken".to_string(),
            template: "Explain {topic}.".to_string(),
            variables: vec!["topic".to_string(), "audience".to_string()],
            announce: "Topic: {topic}".to_string(),
            runs: vec![Bindings::new(), Bindings::new()],
            config: GenerationConfig::default(),
        };
        let echo = Echo::failing_on(vec![]);
        let mut console = captured();
        let outcome = run_all(&[broken], &echo, None, &mut console).await.unwrap();
        assert_eq!(DemoOutcome { runs: 2, failures: 2 }, outcome);
        assert_eq!(0, echo.calls.load(Ordering::SeqCst));
    }

    #[test]
    fn test_load_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{
            "title": "Haiku",
            "template": "Write a haiku about {{subject}}.",
            "variables": ["subject"],
            "announce": "Subject: {{subject}}",
            "runs": [{{"subject": "autumn"}}],
            "config": {{"temperature": 0.5, "max_tokens": 64}}
        }}]"#).unwrap();
        let demos = load(file.path()).unwrap();
        assert_eq!(1, demos.len());
        assert_eq!("Write a haiku about {subject}.", demos[0].template);
        assert_eq!("gpt-3.5-turbo", demos[0].config.model);
        assert_eq!(Some(64), demos[0].config.max_tokens);
        assert!(demos[0].prompt_template().is_ok());
    }

    #[test]
    fn test_load_without_announce() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"title":"T","template":"Explain {{topic}}.","variables":["topic"],"runs":[{{"topic":"x"}}]}}]"#).unwrap();
        let demos = load(file.path()).unwrap();
        assert_eq!(1, demos.len());
        assert_eq!("", demos[0].announce);
        assert_eq!(GenerationConfig::default(), demos[0].config);
        assert_eq!("T", demos[0].announcement(&demos[0].runs[0]));
    }

    #[test]
    fn test_load_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse demonstrations"));
    }
}
