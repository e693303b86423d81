use std::error::Error;
use std::fmt;
use std::fmt::Formatter;
use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;
use url::Url;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Parser, Debug)]
#[command(name = "promptchain-demo", version, about = "Runs canned prompt chains against an OpenAI model, then answers questions interactively")]
pub struct Cli {
    /// Model used by every demonstration, overriding the model in the demonstration config
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of an OpenAI compatible API
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub api_base: Option<String>,

    /// Give up on a single model call after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// JSON file with demonstrations to run instead of the built-in ones
    #[arg(long)]
    pub demos: Option<PathBuf>,

    /// Enter interactive mode without asking
    #[arg(long, conflicts_with = "no_interactive")]
    pub interactive: bool,

    /// Exit after the demonstrations without asking
    #[arg(long)]
    pub no_interactive: bool,

    /// Print replies as plain text instead of rendered markdown
    #[arg(long)]
    pub plain: bool,
}

impl Cli {
    /// `Some` when the command line already decided about interactive mode.
    pub fn interactive_choice(&self) -> Option<bool> {
        if self.interactive {
            Some(true)
        } else if self.no_interactive {
            Some(false)
        } else {
            None
        }
    }
}

/// Settings resolved at startup, before any demonstration runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: String,
    pub api_base: Option<Url>,
    pub deadline: Option<Duration>,
}

impl Settings {
    /// Resolve settings from the command line and the credential read from the environment.
    pub fn resolve(cli: &Cli, api_key: Option<String>) -> Result<Self, ConfigError> {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingCredential)?;
        let api_base = cli.api_base
            .as_deref()
            .map(|raw| Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl { url: raw.to_string(), source }))
            .transpose()?;
        Ok(Self {
            api_key,
            api_base,
            deadline: cli.timeout_secs.map(Duration::from_secs),
        })
    }

    /// The base URL in the form the OpenAI client appends endpoint paths to.
    pub fn api_base_str(&self) -> Option<&str> {
        self.api_base.as_ref().map(|url| url.as_str().trim_end_matches('/'))
    }
}

/// Fatal startup errors.
#[derive(Debug)]
pub enum ConfigError {
    MissingCredential,
    InvalidBaseUrl { url: String, source: url::ParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingCredential =>
                write!(f, "{} not found. Please set it or create a .env file with your API key.", API_KEY_VAR),
            ConfigError::InvalidBaseUrl { url, source } =>
                write!(f, "invalid API base URL {:?}: {}", url, source),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::MissingCredential => None,
            ConfigError::InvalidBaseUrl { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use clap::Parser;
    use super::{Cli, ConfigError, Settings};

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("promptchain-demo").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_missing_credential() {
        let cli = cli(&["--api-base", "https://api.openai.com/v1"]);
        assert!(matches!(Settings::resolve(&cli, None), Err(ConfigError::MissingCredential)));
        assert!(matches!(Settings::resolve(&cli, Some("  ".to_string())), Err(ConfigError::MissingCredential)));
    }

    #[test]
    fn test_resolve() {
        let cli = cli(&["--api-base", "http://localhost:8080/", "--timeout-secs", "30"]);
        let settings = Settings::resolve(&cli, Some("sk-abc\n".to_string())).unwrap();
        assert_eq!("sk-abc", settings.api_key);
        assert_eq!(Some("http://localhost:8080"), settings.api_base_str());
        assert_eq!(Some(Duration::from_secs(30)), settings.deadline);
    }

    #[test]
    fn test_invalid_base_url() {
        let cli = cli(&["--api-base", "not a url"]);
        let err = Settings::resolve(&cli, Some("sk-abc".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_interactive_flags() {
        assert_eq!(None, cli(&[]).interactive_choice());
        assert_eq!(Some(true), cli(&["--interactive"]).interactive_choice());
        assert_eq!(Some(false), cli(&["--no-interactive"]).interactive_choice());
        assert!(Cli::try_parse_from(["promptchain-demo", "--interactive", "--no-interactive"]).is_err());
    }
}
